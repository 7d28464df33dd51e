use anyhow::Result;
use colored::Colorize;
use inquire::Confirm;

use crate::api::ppts::{ListParams, Record, RecordInput};
use crate::cli::{RecordFields, RecordsCommands};
use crate::config::Config;
use crate::records::RecordsStore;

pub fn run(command: RecordsCommands) -> Result<()> {
    let config = Config::load_or_default();
    let client = super::api_client(&config, super::transport());
    if !client.session().is_authenticated() {
        anyhow::bail!("Not signed in. Run `pptdeck auth login` first.");
    }
    let mut store = RecordsStore::new(client);

    match command {
        RecordsCommands::List {
            q,
            tag,
            sort,
            limit,
            offset,
        } => {
            let page = store.fetch_records(ListParams {
                q,
                tag,
                sort: Some(sort),
                limit,
                offset,
            })
            .map_err(super::user_error)?;
            if page.items.is_empty() {
                println!("{}", "No records".dimmed());
                return Ok(());
            }
            for record in &page.items {
                println!("{}", summary_line(record));
            }
            println!(
                "{}",
                format!(
                    "{}-{} of {}",
                    page.offset + 1,
                    page.offset + page.items.len() as u64,
                    page.total
                )
                .dimmed()
            );
        }
        RecordsCommands::Get { id } => {
            let record = store.fetch_record(id).map_err(super::user_error)?;
            print!("{}", details(&record));
        }
        RecordsCommands::Create { name, fields } => {
            let record = store
                .create_record(&input(name, fields))
                .map_err(super::user_error)?;
            println!("{} {}", "Created".green(), summary_line(&record));
        }
        RecordsCommands::Update { id, name, fields } => {
            let record = store
                .update_record(id, &input(name, fields))
                .map_err(super::user_error)?;
            println!("{} {}", "Updated".green(), summary_line(&record));
        }
        RecordsCommands::Delete { id, yes } => {
            if !yes
                && !Confirm::new(&format!("Delete record {id}?"))
                    .with_default(false)
                    .prompt()?
            {
                println!("{}", "Cancelled".dimmed());
                return Ok(());
            }
            store.delete_record(id).map_err(super::user_error)?;
            println!("{} record {id}", "Deleted".green());
        }
        RecordsCommands::Tags => {
            store
                .fetch_records(ListParams::default())
                .map_err(super::user_error)?;
            let tags = store.all_tags();
            if tags.is_empty() {
                println!("{}", "No tags".dimmed());
            }
            for tag in tags {
                println!("{tag}");
            }
        }
    }
    Ok(())
}

fn input(name: String, fields: RecordFields) -> RecordInput {
    RecordInput {
        name,
        title: fields.title,
        description: fields.description,
        tags: fields.tags,
    }
}

fn summary_line(record: &Record) -> String {
    let title = record
        .title
        .as_deref()
        .filter(|t| !t.is_empty())
        .unwrap_or(&record.name);
    let tags = if record.tags.is_empty() {
        String::new()
    } else {
        format!("  [{}]", record.tags.join(", "))
    };
    format!("{:>5}  {title}  {}{tags}", record.id, record.name.dimmed())
}

fn details(record: &Record) -> String {
    let mut out = format!("{} {}\n", "Record".bold(), record.id);
    let mut row = |label: &str, value: &str| {
        if !value.is_empty() {
            out.push_str(&format!("  {:<14}{value}\n", label.dimmed()));
        }
    };
    row("name", &record.name);
    row("title", record.title.as_deref().unwrap_or_default());
    row("description", record.description.as_deref().unwrap_or_default());
    row("group", &record.group_name);
    row("path", &record.relative_path);
    row("status", &record.path_status);
    row("tags", &record.tags.join(", "));
    row("created", record.created_at.as_deref().unwrap_or_default());
    row("updated", record.updated_at.as_deref().unwrap_or_default());
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record() -> Record {
        serde_json::from_str(
            r#"{"id":12,"name":"q3","title":"","groupName":"q3","tags":["finance","2024"]}"#,
        )
        .unwrap()
    }

    #[test]
    fn test_summary_falls_back_to_name() {
        colored::control::set_override(false);
        assert_eq!(summary_line(&record()), "   12  q3  q3  [finance, 2024]");
    }

    #[test]
    fn test_details_skips_empty_fields() {
        colored::control::set_override(false);
        let text = details(&record());
        assert!(text.contains("name"));
        assert!(text.contains("finance, 2024"));
        assert!(!text.contains("description"));
        assert!(!text.contains("created"));
    }
}
