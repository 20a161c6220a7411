//! Read-only users table.

use std::error::Error;

use crate::api::{UserRecord, UserRole, UserStatus};
use crate::cli::CliContext;

const HEADERS: [&str; 6] = ["ID", "NAME", "HANDLE", "EMAIL", "ROLE", "STATUS"];

fn status_marker(status: &UserStatus) -> &'static str {
    match status {
        UserStatus::Online => "●",
        UserStatus::Away => "◐",
        UserStatus::Offline => "○",
        UserStatus::Other(_) => "·",
    }
}

fn row(user: &UserRecord) -> [String; 6] {
    let text = |value: &Option<String>| value.clone().unwrap_or_else(|| "-".to_string());
    let role = user.role();
    let role = match role {
        UserRole::Admin | UserRole::Moderator => role.label().to_uppercase(),
        UserRole::Other(_) => role.label().to_string(),
    };
    let status = user.status();
    [
        user.id.to_string(),
        text(&user.name),
        user.handle
            .as_deref()
            .map_or_else(|| "-".to_string(), |handle| format!("@{handle}")),
        text(&user.email),
        role,
        format!("{} {}", status_marker(&status), status.label()),
    ]
}

pub fn format_users_table(users: &[UserRecord]) -> String {
    let rows: Vec<[String; 6]> = users.iter().map(row).collect();
    let mut widths = HEADERS.map(|header| header.chars().count());
    for row in &rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.chars().count());
        }
    }

    let render = |cells: &[String]| {
        cells
            .iter()
            .zip(widths)
            .map(|(cell, width)| {
                let pad = width - cell.chars().count();
                format!("{cell}{}", " ".repeat(pad))
            })
            .collect::<Vec<_>>()
            .join("  ")
            .trim_end()
            .to_string()
    };

    let header: Vec<String> = HEADERS.iter().map(|h| h.to_string()).collect();
    let mut lines = vec![render(&header)];
    lines.extend(rows.iter().map(|row| render(row)));
    lines.join("\n")
}

pub async fn list_users(ctx: &CliContext) -> Result<(), Box<dyn Error>> {
    let users = ctx.session.list_users().await.map_err(|err| {
        format!("Failed to load users from {}: {err}", ctx.backend_url)
    })?;

    if users.is_empty() {
        println!("No users found.");
    } else {
        println!("{}", format_users_table(&users));
        println!();
        println!("{} user(s)", users.len());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn table_aligns_columns_and_fills_gaps() {
        let users: Vec<UserRecord> = serde_json::from_value(json!([
            { "id": 1, "name": "Ada Lovelace", "handle": "ada", "email": "ada@example.com", "role": "Admin", "status": "ONLINE" },
            { "id": "u-22", "name": "Bo", "status": "away" }
        ]))
        .unwrap();

        let table = format_users_table(&users);
        let lines: Vec<&str> = table.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("ID    NAME          HANDLE  EMAIL"));
        assert!(lines[1].starts_with("1     Ada Lovelace  @ada    ada@example.com  ADMIN"));
        assert!(lines[1].ends_with("● Online"));
        assert!(lines[2].starts_with("u-22  Bo            -       -"));
        assert!(lines[2].contains("member"));
        assert!(lines[2].ends_with("◐ Away"));
    }

    #[test]
    fn unknown_status_keeps_original_text() {
        let users: Vec<UserRecord> =
            serde_json::from_value(json!([{ "id": 3, "status": "busy", "role": "Editor" }]))
                .unwrap();
        let table = format_users_table(&users);
        assert!(table.contains("Editor"));
        assert!(table.ends_with("· busy"));
    }
}
