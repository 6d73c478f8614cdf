//! Snapshot viewer: `adw status`.

use anyhow::Result;

use adw::config::AdwConfig;
use adw::state::StateStore;

pub fn cmd_status(config: &AdwConfig, issue: u64, json: bool) -> Result<bool> {
    let store = StateStore::new(config.state_dir());
    let Some(result) = store.load(issue)? else {
        println!("No recorded cycle for issue #{}", issue);
        return Ok(true);
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
        return Ok(true);
    }

    println!();
    println!("Issue #{}", result.item);
    println!("=========");
    if result.success {
        println!("Result:        {}", console::style("completed").green());
    } else {
        println!(
            "Result:        {} at {} phase",
            console::style("failed").red(),
            result.phase_name()
        );
    }
    if let Some(error) = &result.error {
        println!("Error:         {}", error);
    }
    if let Some(spec) = &result.spec_path {
        println!("Spec:          {}", spec);
    }
    if let Some(sha) = &result.commit_sha {
        println!("Commit:        {}", sha);
    }
    println!("Test attempts: {}", result.test_attempts);
    println!("Started:       {}", result.started_at.to_rfc3339());
    if let Some(finished) = result.finished_at {
        println!("Finished:      {}", finished.to_rfc3339());
    }
    println!();
    Ok(true)
}
