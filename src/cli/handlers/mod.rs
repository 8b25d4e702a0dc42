mod init;
pub use init::cmd_init;

use std::fs;
use std::io::Read;
use std::path::PathBuf;
use std::time::Duration;

use serde_json::Value;

use crate::cli::commands::*;
use crate::cli::output::*;
use crate::dnd::{DragItem, DropOutcome};
use crate::io::config_io;
use crate::io::file_store::FileStore;
use crate::io::watcher::{StoreEvent, StoreWatcher};
use crate::model::TrellisConfig;
use crate::ops::locate;
use crate::ops::normalize::{normalize, normalize_document};
use crate::panel::Panel;
use crate::sync::{DocumentStore, Level};

type CmdResult = Result<(), Box<dyn std::error::Error>>;

// ---------------------------------------------------------------------------
// Dispatch
// ---------------------------------------------------------------------------

pub fn dispatch(cli: Cli) -> CmdResult {
    let json = cli.json;
    let dir = cli.workspace_dir.as_deref();

    match cli.command {
        // No workspace needed
        Commands::Init(args) => cmd_init(args, dir, json),
        Commands::Normalize(args) => cmd_normalize(args),

        // Read commands
        Commands::Lists => cmd_lists(dir, json),
        Commands::Show(args) => cmd_show(args, dir, json),
        Commands::Watch(args) => cmd_watch(args, dir, json),

        // Write commands
        Commands::Open(args) => cmd_open(args, dir, json),
        Commands::Add(cmd) => cmd_add(cmd, dir, json),
        Commands::Text(args) => cmd_text(args, dir),
        Commands::Toggle(args) => cmd_toggle(args, dir),
        Commands::Collapse(args) => cmd_collapse(args, dir),
        Commands::Rm(args) => cmd_rm(args, dir),
        Commands::Rename(args) => cmd_rename(args, dir),
        Commands::Mv(args) => cmd_mv(args, dir, json),
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

struct Workspace {
    dir: PathBuf,
    config: TrellisConfig,
}

/// Directory to start from: the `-C` override or the current directory.
fn workspace_start(dir: Option<&str>) -> Result<PathBuf, Box<dyn std::error::Error>> {
    match dir {
        Some(dir) => Ok(fs::canonicalize(dir)
            .map_err(|e| format!("cannot resolve -C path '{}': {}", dir, e))?),
        None => Ok(std::env::current_dir()?),
    }
}

fn load_workspace(dir: Option<&str>) -> Result<Workspace, Box<dyn std::error::Error>> {
    let root = config_io::discover_workspace(&workspace_start(dir)?)?;
    let dir = config_io::trellis_dir(&root);
    let config = config_io::read_config(&dir)?;
    Ok(Workspace { dir, config })
}

/// A panel attached to an existing list.
fn open_list(ws: &Workspace, list: &str) -> Result<Panel<FileStore>, Box<dyn std::error::Error>> {
    let store = FileStore::open(&ws.dir)?;
    let mut panel = Panel::new(store, &ws.config);
    panel.attach(list)?;
    Ok(panel)
}

/// A CLI invocation ends right after its write, so a save that did not go
/// through is reported as a failure instead of being retried.
fn finish(panel: &mut Panel<FileStore>) -> CmdResult {
    let notes = panel.drain_notifications();
    if notes.is_empty() && !panel.has_pending_commit() {
        return Ok(());
    }
    for note in &notes {
        let label = match note.level {
            Level::Warning => "warning",
            Level::Error => "error",
        };
        eprintln!("{}: {}", label, note.message);
    }
    Err("changes were not saved".into())
}

// ---------------------------------------------------------------------------
// Read commands
// ---------------------------------------------------------------------------

fn cmd_lists(dir: Option<&str>, json: bool) -> CmdResult {
    let ws = load_workspace(dir)?;
    let store = FileStore::open(&ws.dir)?;

    let mut summaries = Vec::new();
    for id in store.list_ids()? {
        if let Some(raw) = store.fetch(&id)? {
            let doc = normalize_document(&raw);
            summaries.push(ListSummaryJson::new(doc.id, doc.title, &doc.groups));
        }
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&summaries)?);
    } else if summaries.is_empty() {
        println!("no lists");
    } else {
        for s in &summaries {
            println!(
                "{}  {}  ({} groups, {}/{} done)",
                s.id, s.title, s.groups, s.completed, s.tasks
            );
        }
    }
    Ok(())
}

fn cmd_show(args: ShowArgs, dir: Option<&str>, json: bool) -> CmdResult {
    let ws = load_workspace(dir)?;
    let panel = open_list(&ws, &args.list)?;
    if json {
        let out = ListJson {
            id: &args.list,
            title: panel.title(),
            groups: panel.tree(),
        };
        println!("{}", serde_json::to_string_pretty(&out)?);
    } else {
        print!(
            "{}",
            render_tree(panel.title(), panel.tree(), ws.config.ui.max_text_width, args.all)
        );
    }
    Ok(())
}

fn cmd_watch(args: WatchArgs, dir: Option<&str>, json: bool) -> CmdResult {
    let ws = load_workspace(dir)?;
    let store = FileStore::open(&ws.dir)?;
    let watcher = StoreWatcher::start(&store.lists_dir())?;

    let print_current = |store: &FileStore| -> Result<bool, Box<dyn std::error::Error>> {
        let Some(raw) = store.fetch(&args.list)? else {
            return Ok(false);
        };
        let doc = normalize_document(&raw);
        if json {
            // one document per line
            println!("{}", serde_json::to_string(&doc)?);
        } else {
            print!(
                "{}",
                render_tree(&doc.title, &doc.groups, ws.config.ui.max_text_width, false)
            );
            println!();
        }
        Ok(true)
    };

    if !print_current(&store)? {
        return Err(format!("list not found: {}", args.list).into());
    }
    loop {
        let Some(StoreEvent::Changed(id)) = watcher.wait(Duration::from_secs(1)) else {
            continue;
        };
        if id != args.list {
            continue;
        }
        // collapse the burst of events a single write produces
        watcher.poll();
        if !print_current(&store)? {
            println!("list {} was deleted", args.list);
            return Ok(());
        }
    }
}

fn cmd_normalize(args: NormalizeArgs) -> CmdResult {
    let text = if args.file == "-" {
        let mut buf = String::new();
        std::io::stdin().read_to_string(&mut buf)?;
        buf
    } else {
        fs::read_to_string(&args.file).map_err(|e| format!("could not read {}: {}", args.file, e))?
    };
    let raw: Value = serde_json::from_str(&text)?;
    println!("{}", serde_json::to_string_pretty(&normalize(&raw))?);
    Ok(())
}

// ---------------------------------------------------------------------------
// Write commands
// ---------------------------------------------------------------------------

fn cmd_open(args: OpenArgs, dir: Option<&str>, json: bool) -> CmdResult {
    let ws = load_workspace(dir)?;
    let store = FileStore::open(&ws.dir)?;
    let mut panel = Panel::new(store, &ws.config);
    let name = args.name.as_deref().unwrap_or(&ws.config.list.name);
    let id = panel.open(&args.instance, name)?;
    if json {
        let out = CreatedJson { kind: "list", id: &id };
        println!("{}", serde_json::to_string_pretty(&out)?);
    } else {
        println!("{id}");
    }
    Ok(())
}

fn cmd_add(cmd: AddCmd, dir: Option<&str>, json: bool) -> CmdResult {
    let ws = load_workspace(dir)?;
    let (list, kind) = match &cmd {
        AddCmd::Group { list, .. } => (list, "group"),
        AddCmd::Task { list, .. } => (list, "task"),
        AddCmd::Subtask { list, .. } => (list, "subtask"),
    };
    let mut panel = open_list(&ws, list)?;

    let (id, text) = match &cmd {
        AddCmd::Group { title, .. } => (panel.add_group()?, title),
        AddCmd::Task { group, text, .. } => (panel.add_task(group)?, text),
        AddCmd::Subtask { task, text, .. } => (panel.add_subtask(task)?, text),
    };
    match text {
        Some(text) => {
            panel.set_text(&id, text)?;
        }
        None => panel.finish_editing(),
    }
    finish(&mut panel)?;

    if json {
        let out = CreatedJson { kind, id: &id };
        println!("{}", serde_json::to_string_pretty(&out)?);
    } else {
        println!("{id}");
    }
    Ok(())
}

fn cmd_text(args: TextArgs, dir: Option<&str>) -> CmdResult {
    let ws = load_workspace(dir)?;
    let mut panel = open_list(&ws, &args.list)?;
    let kind = panel.set_text(&args.id, &args.text)?;
    finish(&mut panel)?;
    println!("{} {} updated", kind.as_str(), args.id);
    Ok(())
}

fn cmd_toggle(args: ItemArgs, dir: Option<&str>) -> CmdResult {
    let ws = load_workspace(dir)?;
    let mut panel = open_list(&ws, &args.list)?;
    let completed = panel.toggle_completed(&args.id)?;
    finish(&mut panel)?;
    println!("{} {}", args.id, if completed { "completed" } else { "not completed" });
    Ok(())
}

fn cmd_collapse(args: ItemArgs, dir: Option<&str>) -> CmdResult {
    let ws = load_workspace(dir)?;
    let mut panel = open_list(&ws, &args.list)?;
    let collapsed = panel.toggle_collapsed(&args.id)?;
    finish(&mut panel)?;
    println!("{} {}", args.id, if collapsed { "collapsed" } else { "expanded" });
    Ok(())
}

fn cmd_rm(args: ItemArgs, dir: Option<&str>) -> CmdResult {
    let ws = load_workspace(dir)?;
    let mut panel = open_list(&ws, &args.list)?;
    let kind = panel.delete(&args.id)?;
    finish(&mut panel)?;
    println!("deleted {} {}", kind.as_str(), args.id);
    Ok(())
}

fn cmd_rename(args: RenameArgs, dir: Option<&str>) -> CmdResult {
    let ws = load_workspace(dir)?;
    let mut panel = open_list(&ws, &args.list)?;
    panel.rename(&args.title)?;
    finish(&mut panel)?;
    println!("renamed {} to \"{}\"", args.list, args.title);
    Ok(())
}

/// Run one full drag: start on `active`, hover and drop on `over`.
fn cmd_mv(args: MvArgs, dir: Option<&str>, json: bool) -> CmdResult {
    let active: DragItem = args.active.parse()?;
    let over: DragItem = args.over.parse()?;

    let ws = load_workspace(dir)?;
    let mut panel = open_list(&ws, &args.list)?;
    for item in [&active, &over] {
        if !locate::contains_id(panel.tree(), item.id()) {
            return Err(format!("not found: {}", item).into());
        }
    }
    if !panel.drag_start(active.clone()) {
        return Err(format!("{} cannot be dragged; only groups, tasks and subtasks can", active).into());
    }
    panel.drag_over(Some(over.clone()));
    panel.on_frame();
    let outcome = panel.drag_end(Some(over));
    finish(&mut panel)?;

    let label = match outcome {
        DropOutcome::Commit(_) => "moved",
        DropOutcome::Unchanged => "unchanged",
        DropOutcome::RolledBack => "rolled_back",
        DropOutcome::NotDragging => "not_dragging",
    };
    if json {
        let out = MoveJson {
            outcome: label,
            groups: panel.tree(),
        };
        println!("{}", serde_json::to_string_pretty(&out)?);
    } else if matches!(outcome, DropOutcome::Commit(_)) {
        println!("moved {}", active);
    } else {
        println!("nothing to move");
    }
    Ok(())
}
