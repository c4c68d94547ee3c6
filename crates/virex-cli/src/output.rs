//! Terminal rendering for command results.

use chrono::{DateTime, Local, TimeZone};
use serde_json::json;

use virex::api::TemplateItem;
use virex::{human_size, Artifact, ArtifactStore, JobSnapshot, JobState, SessionStore};

pub fn print_transition(snapshot: &JobSnapshot, json: bool) -> anyhow::Result<()> {
    if json {
        println!("{}", serde_json::to_string(snapshot)?);
        return Ok(());
    }

    match (&snapshot.state, &snapshot.result) {
        (JobState::Completed, Some(artifact)) => println!(
            "[{}] {} -> {} ({})",
            snapshot.state,
            snapshot.progress_message,
            artifact.path.display(),
            artifact.human_size()
        ),
        _ => println!("[{}] {}", snapshot.state, snapshot.progress_message),
    }
    Ok(())
}

pub fn print_history(artifacts: &[Artifact], json: bool) -> anyhow::Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(artifacts)?);
        return Ok(());
    }

    if artifacts.is_empty() {
        println!("No results yet");
        return Ok(());
    }

    for artifact in artifacts {
        println!(
            "{:<40} {:>10}  {}",
            artifact.file_name,
            artifact.human_size(),
            local_time(&artifact.created_at)
        );
    }
    Ok(())
}

pub fn print_status(
    session: &SessionStore,
    store: &ArtifactStore,
    json: bool,
) -> anyhow::Result<()> {
    let total_size = store.total_size()?;

    if json {
        let status = json!({
            "loggedIn": session.is_logged_in(),
            "userId": session.user_id(),
            "displayName": session.display_name(),
            "isPremium": session.is_premium(),
            "subscriptionExpires": session.subscription_expires(),
            "totalVideos": session.total_videos(),
            "lastTemplate": session.last_template(),
            "serverUrl": session.server_url(),
            "cacheDirectory": store.directory(),
            "cacheBytes": total_size,
        });
        println!("{}", serde_json::to_string_pretty(&status)?);
        return Ok(());
    }

    if session.is_logged_in() {
        let plan = if session.is_premium() { "premium" } else { "free" };
        println!(
            "Signed in as {} (id {}, {})",
            session.display_name(),
            session.user_id(),
            plan
        );
        if session.subscription_expires() > 0 {
            if let Some(expires) = Local.timestamp_opt(session.subscription_expires(), 0).single() {
                println!("Subscription expires {}", expires.format("%Y-%m-%d"));
            }
        }
    } else {
        println!("Not signed in");
    }
    println!("Videos processed: {}", session.total_videos());
    println!("Last template:    {}", session.last_template());
    println!("Server:           {}", session.server_url());
    println!(
        "Cache:            {} ({})",
        store.directory().display(),
        human_size(total_size)
    );
    Ok(())
}

pub fn print_template(template: &TemplateItem, is_last: bool) {
    let marker = if is_last { "*" } else { " " };
    let premium = if template.is_premium { " [premium]" } else { "" };
    if template.description.is_empty() {
        println!("{} {:<16} {}{}", marker, template.id, template.name, premium);
    } else {
        println!(
            "{} {:<16} {}{} - {}",
            marker, template.id, template.name, premium, template.description
        );
    }
}

fn local_time<Tz: TimeZone>(time: &DateTime<Tz>) -> String {
    time.with_timezone(&Local).format("%Y-%m-%d %H:%M").to_string()
}
