//! Block Kit message construction for alerts.

use {
    serde_json::{Value, json},
    vigil_alerts::{AlertEvent, CheckFailure, Recipient, ServiceStatus},
};

/// Per-status emoji used in the header block.
pub fn status_emoji(status: ServiceStatus) -> &'static str {
    match status {
        ServiceStatus::Passing => ":large_green_circle:",
        ServiceStatus::Warning => ":large_yellow_circle:",
        ServiceStatus::Error => ":red_circle:",
        ServiceStatus::Critical => ":alert:",
        ServiceStatus::Acked => ":zipper_mouth_face:",
    }
}

/// Notification fallback text for the message.
pub fn fallback_text(event: &AlertEvent) -> String {
    format!("{} is {}", event.service_name, event.status)
}

fn header_block(event: &AlertEvent) -> Value {
    let emoji = status_emoji(event.status);
    json!({
        "type": "header",
        "text": {
            "type": "plain_text",
            "text": format!(
                "{emoji} {} status is {} {emoji}",
                event.service_name, event.status
            ),
        }
    })
}

fn check_block(check: &CheckFailure) -> Value {
    // Escape characters that would break out of the mrkdwn link and code span.
    let name = check.name.replace('>', "\\>");
    let error = check
        .error
        .as_deref()
        .unwrap_or_default()
        .replace('`', "\\`");

    let title = match check.detail_url.as_deref() {
        Some(url) => format!("<{url}|{name}>"),
        None => name,
    };

    let mut block = json!({
        "type": "section",
        "text": {
            "type": "mrkdwn",
            "text": format!("*{title}* - `{error}`"),
        },
    });

    // Accessory button linking to the check's external status page.
    if let Some(url) = check.status_url.as_deref() {
        block["accessory"] = json!({
            "type": "button",
            "text": {
                "type": "plain_text",
                "text": check.status_label.as_deref().unwrap_or("Status"),
                "emoji": false,
            },
            "url": url,
            "action_id": "button-status",
        });
    }
    block
}

fn mention_block(mention_ids: &[String]) -> Value {
    let mentions = mention_ids
        .iter()
        .map(|id| format!("<@{id}>"))
        .collect::<Vec<_>>()
        .join(" ");
    json!({
        "type": "context",
        "elements": [{ "type": "mrkdwn", "text": format!("{mentions} :point_up:") }]
    })
}

fn unresolved_block(unresolved: &[Recipient]) -> Value {
    let listed = unresolved
        .iter()
        .map(|recipient| match recipient.display_name.as_deref() {
            Some(name) => format!("{} ({name})", recipient.identifier),
            None => recipient.identifier.clone(),
        })
        .collect::<Vec<_>>()
        .join(", ");
    json!({
        "type": "context",
        "elements": [{
            "type": "mrkdwn",
            "text": format!(
                "Could not find Slack account for some users: {listed}.\n\
                 Please ensure they have a Slack account, or set a user ID \
                 override in their profile (enter 'ignore' to silence this)."
            ),
        }]
    })
}

/// Assemble the full block list for an alert.
///
/// `mention_ids` and `unresolved` are empty when the transition's policy
/// disallows mentions; `image_permalink` is the uploaded attachment, if any.
pub fn build_blocks(
    event: &AlertEvent,
    mention_ids: &[String],
    unresolved: &[Recipient],
    image_permalink: Option<&str>,
) -> Vec<Value> {
    let mut blocks = vec![header_block(event)];

    if let Some(body) = event.message_body.as_deref() {
        blocks.push(json!({
            "type": "section",
            "text": { "type": "mrkdwn", "text": body },
        }));
    }

    for check in &event.failing_checks {
        blocks.push(check_block(check));
    }

    if let Some(link) = image_permalink {
        blocks.push(json!({
            "type": "section",
            "text": { "type": "mrkdwn", "text": format!("<{link}|status graph>") },
        }));
    }

    if !mention_ids.is_empty() {
        blocks.push(mention_block(mention_ids));
    }
    if !unresolved.is_empty() {
        blocks.push(unresolved_block(unresolved));
    }

    blocks
}
