//! `discover browse`: an interactive listing on the terminal.
//!
//! Reads commands from stdin and drives a [`ListController`]. Each command
//! updates the state as soon as it is read, and only the wait for its
//! response runs as a separate task. Typing quickly leaves several queries in
//! flight; only the page of the most recently issued one is printed, and
//! superseded responses are dropped.
//!
//! ```text
//! search <text>        set the name filter (empty clears it)
//! tag <tag>            select a tag (rows match any selected tag)
//! untag <tag>          unselect a tag
//! tags clear           clear selected tags
//! sort <col> [asc|desc]  add a sort key (default desc)
//! unsort <col>         remove a sort key
//! sorts clear          clear all sort keys
//! page <n> | next | prev
//! refresh | help | quit
//! ```

use std::sync::Arc;

use anyhow::Result;
use discover_core::{
    ListController, ListSource, ListView, QueryError, SortDirection, SortSpec, StateChange, Step,
};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::task::JoinSet;
use tracing::debug;

use crate::config::Config;
use crate::db;
use crate::list::{display_columns, query_builder, render_view};
use crate::remote::HttpListSource;
use crate::sqlite_store::SqliteStore;

/// One parsed REPL line.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Change(StateChange),
    Help,
    Quit,
}

pub fn parse_command(line: &str) -> Result<Option<Command>, String> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }
    let (word, rest) = match line.split_once(char::is_whitespace) {
        Some((word, rest)) => (word, rest.trim()),
        None => (line, ""),
    };

    let change = match (word, rest) {
        ("help", _) | ("?", _) => return Ok(Some(Command::Help)),
        ("quit", _) | ("exit", _) => return Ok(Some(Command::Quit)),
        ("search", text) => StateChange::Search(text.to_string()),
        ("tags", "clear") => StateChange::SetTags(Vec::new()),
        ("tag", "") => return Err("usage: tag <tag>".to_string()),
        ("tag", tag) => StateChange::AddTag(tag.to_string()),
        ("untag", "") => return Err("usage: untag <tag>".to_string()),
        ("untag", tag) => StateChange::RemoveTag(tag.to_string()),
        ("sorts", "clear") => StateChange::ClearSorts,
        ("sort", args) => {
            let mut parts = args.split_whitespace();
            let column = parts.next().ok_or("usage: sort <column> [asc|desc]")?;
            let direction = match parts.next() {
                Some(d) => d.parse::<SortDirection>().map_err(|e| e.to_string())?,
                None => SortDirection::Desc,
            };
            StateChange::AddSort(SortSpec {
                column: column.to_string(),
                direction,
            })
        }
        ("unsort", "") => return Err("usage: unsort <column>".to_string()),
        ("unsort", column) => StateChange::RemoveSort(column.to_string()),
        ("page", n) => StateChange::SetPage(
            n.parse()
                .map_err(|_| format!("page must be a number, got '{}'", n))?,
        ),
        ("next", "") => StateChange::NextPage,
        ("prev", "") => StateChange::PrevPage,
        ("refresh", "") => StateChange::Refresh,
        _ => return Err(format!("unknown command: '{}' (try 'help')", line)),
    };
    Ok(Some(Command::Change(change)))
}

fn print_help() {
    println!("commands:");
    println!("  search <text>          set the name filter (empty clears it)");
    println!("  tag <tag>              select a tag");
    println!("  untag <tag>            unselect a tag");
    println!("  tags clear             clear selected tags");
    println!("  sort <col> [asc|desc]  add a sort key");
    println!("  unsort <col>           remove a sort key");
    println!("  sorts clear            clear all sort keys");
    println!("  page <n> | next | prev");
    println!("  refresh | quit");
}

pub async fn run_browse(config: &Config, table_name: &str, remote: Option<&str>) -> Result<()> {
    let columns = display_columns(config, table_name, &[]);
    match remote {
        Some(url) => {
            let controller = ListController::new(HttpListSource::new(url)?, table_name)
                .with_page_size(config.listing.page_size);
            browse(controller, columns).await
        }
        None => {
            let pool = db::connect(config).await?;
            let controller =
                ListController::new(query_builder(config, SqliteStore::new(pool.clone())), table_name)
                    .with_page_size(config.listing.page_size);
            let result = browse(controller, columns).await;
            pool.close().await;
            result
        }
    }
}

/// Drive `controller` from stdin until `quit` or end of input.
///
/// In-flight queries are awaited before returning.
pub async fn browse<L: ListSource + 'static>(
    controller: ListController<L>,
    default_columns: Vec<String>,
) -> Result<()> {
    let controller = Arc::new(controller);
    let default_columns = Arc::new(default_columns);
    let mut tasks = JoinSet::new();

    dispatch(&mut tasks, &controller, &default_columns, StateChange::Refresh);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        match parse_command(&line) {
            Ok(None) => {}
            Ok(Some(Command::Quit)) => break,
            Ok(Some(Command::Help)) => print_help(),
            Ok(Some(Command::Change(change))) => {
                dispatch(&mut tasks, &controller, &default_columns, change)
            }
            Err(msg) => eprintln!("{}", msg),
        }
        // Reap finished queries so the set does not grow without bound.
        while tasks.try_join_next().is_some() {}
    }

    while tasks.join_next().await.is_some() {}
    Ok(())
}

/// Apply `change` now, on the caller's task, and spawn only the wait for its
/// response. Generations therefore follow input order.
fn dispatch<L: ListSource + 'static>(
    tasks: &mut JoinSet<()>,
    controller: &Arc<ListController<L>>,
    default_columns: &Arc<Vec<String>>,
    change: StateChange,
) {
    let pending = match controller.begin(change) {
        Ok(Step::Issued(pending)) => pending,
        Ok(Step::Unchanged(view)) => {
            show(&view, default_columns);
            return;
        }
        Err(e) => {
            eprintln!("error: {}", e);
            return;
        }
    };

    let controller = controller.clone();
    let default_columns = default_columns.clone();
    tasks.spawn(async move {
        match controller.complete(pending).await {
            Ok(view) => show(&view, &default_columns),
            Err(QueryError::StaleResponse { generation, latest }) => {
                debug!(generation, latest, "dropped superseded response");
            }
            Err(e) => eprintln!("error: {}", e),
        }
    });
}

fn show(view: &ListView, default_columns: &[String]) {
    let columns: Vec<String> = if view.sorts.is_empty() {
        default_columns.to_vec()
    } else {
        view.sorts.iter().map(|s| s.column.clone()).collect()
    };
    println!("{}", render_view(view, &columns));
}
