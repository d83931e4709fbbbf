//! Floor-plan command-line tool.
//!
//! Loads a plan file, replays it through an editing session (straightening
//! strokes and room outlines) and prints the gross internal area.

mod args;
mod plan;

use args::{Command, HistoryTarget};
use floorplan_core::area::format_area_sq_ft;
use floorplan_core::storage::{FileStorage, HistoryAutoSave, Storage, create_default_storage};
use floorplan_core::{EngineConfig, GiaResult, Session};
use plan::PlanFile;
use std::error::Error;
use std::sync::Arc;

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::init();

    let args = match args::parse(std::env::args().skip(1)) {
        Ok(Command::Run(args)) => args,
        Ok(Command::Help) => {
            println!("{}", args::USAGE);
            return Ok(());
        }
        Err(e) => {
            eprintln!("{}\n\n{}", e, args::USAGE);
            return Err(e.into());
        }
    };

    if let Err(e) = run(args) {
        log::error!("{}", e);
        return Err(e);
    }
    Ok(())
}

fn run(args: args::Args) -> Result<(), Box<dyn Error>> {
    let config = match &args.config {
        Some(path) => EngineConfig::load(path)?,
        None => EngineConfig::default(),
    };
    let plan = PlanFile::load(&args.plan)?;
    log::info!(
        "Loaded {} with {} rooms and {} strokes",
        args.plan.display(),
        plan.rooms.len(),
        plan.strokes.len()
    );

    let mut session = Session::new(config.clone())?;
    let summary = plan::apply(&plan, &mut session)?;
    log::info!(
        "Applied {} rooms, {} strokes ({} skipped)",
        summary.rooms,
        summary.strokes,
        summary.skipped
    );

    let gia = session.gia();
    if args.json {
        println!("{}", serde_json::to_string_pretty(&gia)?);
    } else {
        print_report(&gia, config.area.precision as usize);
    }

    let document_id = args
        .plan
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("plan")
        .to_string();
    match args.history {
        HistoryTarget::None => {}
        HistoryTarget::DefaultLocation => {
            save_history(create_default_storage()?, &document_id, &session, &config)?
        }
        HistoryTarget::Directory(dir) => {
            save_history(Arc::new(FileStorage::new(dir)?), &document_id, &session, &config)?
        }
    }

    session.dispose();
    Ok(())
}

fn save_history<S: Storage>(
    storage: Arc<S>,
    document_id: &str,
    session: &Session,
    config: &EngineConfig,
) -> Result<(), Box<dyn Error>> {
    let mut autosave =
        HistoryAutoSave::new(storage, document_id).with_max_states(config.history.max_states);
    autosave.mark_dirty();
    pollster::block_on(autosave.save(session.history().stack()))?;
    log::info!(
        "Saved {} undo states for {}",
        session.history().stack().past.len(),
        document_id
    );
    Ok(())
}

fn print_report(gia: &GiaResult, precision: usize) {
    if !gia.is_valid {
        println!(
            "No gross internal area: {}",
            gia.error_message.as_deref().unwrap_or("no rooms")
        );
        return;
    }

    for room in &gia.rooms {
        println!(
            "{:<24} {:>12}  {:>12}",
            room.name,
            floorplan_core::format_area(room.area_m2, precision),
            format_area_sq_ft(room.area_sq_ft, precision)
        );
    }
    println!(
        "{:<24} {:>12}  {:>12}",
        "GIA",
        gia.formatted(precision),
        format_area_sq_ft(gia.area_sq_ft, precision)
    );
    println!("Perimeter: {:.*} m", precision, gia.perimeter);
}
