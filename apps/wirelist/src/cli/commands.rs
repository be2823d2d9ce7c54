//! # CLI Command Implementations
//!
//! Each command opens the database, runs one operation and exits.

use serde::Serialize;
use std::path::{Path, PathBuf};
use wirelist_core::{
    CdrId, Interconnect, NetId, PinCid, PinRef, ReportWidths, ViewFilter, WirelistError,
    primitives::{EMIT_EXTENSION, LINK_FILTER_BANNER},
};

/// Maximum size of a JSON file accepted by `import` (100 MB).
const MAX_IMPORT_FILE_SIZE: u64 = 100 * 1024 * 1024;

/// Settings shared by every command.
#[derive(Debug, Clone)]
pub struct Context {
    pub db_path: PathBuf,
    pub filter: ViewFilter,
    pub widths: ReportWidths,
    pub json_mode: bool,
}

impl Context {
    fn open(&self) -> Result<Interconnect, WirelistError> {
        Interconnect::with_redb(&self.db_path)
    }
}

// =============================================================================
// OUTPUT HELPERS
// =============================================================================

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<(), WirelistError> {
    let text = serde_json::to_string_pretty(value)
        .map_err(|e| WirelistError::SerializationError(e.to_string()))?;
    println!("{}", text);
    Ok(())
}

/// Print `value` as JSON in JSON mode, else the text line.
fn report_outcome<T: Serialize>(ctx: &Context, value: &T, text: &str) -> Result<(), WirelistError> {
    if ctx.json_mode {
        print_json(value)
    } else {
        println!("{}", text);
        Ok(())
    }
}

fn write_file(path: &Path, data: &[u8]) -> Result<(), WirelistError> {
    std::fs::write(path, data)
        .map_err(|e| WirelistError::IoError(format!("Write '{}': {}", path.display(), e)))
}

/// Check a file to read: it must be a regular file no larger than
/// `max_size`.
fn validate_input_file(path: &Path, max_size: u64) -> Result<(), WirelistError> {
    let metadata = std::fs::metadata(path).map_err(|e| {
        WirelistError::IoError(format!("Invalid file path '{}': {}", path.display(), e))
    })?;
    if !metadata.is_file() {
        return Err(WirelistError::IoError(format!(
            "Path '{}' is not a regular file",
            path.display()
        )));
    }
    if metadata.len() > max_size {
        return Err(WirelistError::SerializationError(format!(
            "File size {} bytes exceeds maximum allowed {} bytes",
            metadata.len(),
            max_size
        )));
    }
    Ok(())
}

// =============================================================================
// PINS AND NETS
// =============================================================================

/// Add a conductor between two pins, creating pins and nets as needed.
pub fn cmd_ac(
    ctx: &Context,
    a: &PinRef,
    b: &PinRef,
    cable: Option<u64>,
) -> Result<(), WirelistError> {
    let mut ic = ctx.open()?;
    let conductor = ic.add_link(a, b, cable)?;
    report_outcome(
        ctx,
        &conductor,
        &format!("{}: {} -> {}", conductor, conductor.a_net, conductor.b_net),
    )
}

/// Add a pin to an existing net.
pub fn cmd_ap(ctx: &Context, pin: &PinRef, net_num: i64) -> Result<(), WirelistError> {
    let mut ic = ctx.open()?;
    let added = ic.add_pin_to_net(pin, net_num)?;
    report_outcome(
        ctx,
        &added,
        &format!("{}.{} on {}", added.key.conn, added.key.desig, added.key.net),
    )
}

/// Delete a net with its conductors and pins.
pub fn cmd_rmnet(ctx: &Context, unit: &str, net_num: i64) -> Result<(), WirelistError> {
    let mut ic = ctx.open()?;
    let id = NetId::new(unit, net_num);
    let removal = ic.delete_net(&id)?;
    report_outcome(
        ctx,
        &removal,
        &format!(
            "Deleted {} ({} conductors, {} pins)",
            id, removal.conductors, removal.pins
        ),
    )
}

/// Set or clear the signal description of a pin by display id.
pub fn cmd_descp(ctx: &Context, pin_cid: usize, words: &[String]) -> Result<(), WirelistError> {
    let mut ic = ctx.open()?;
    let text = words.join(" ");
    let sig_desc = (!text.is_empty()).then_some(text.as_str());
    let pin = ic.set_pin_description(&ctx.filter, PinCid(pin_cid), sig_desc)?;
    report_outcome(
        ctx,
        &pin,
        &format!(
            "{}.{} on {}: {}",
            pin.key.conn,
            pin.key.desig,
            pin.key.net,
            pin.sig_desc.as_deref().unwrap_or("")
        ),
    )
}

/// Delete a pin by display id.
pub fn cmd_rmpin(ctx: &Context, pin_cid: usize) -> Result<(), WirelistError> {
    let mut ic = ctx.open()?;
    let pin = ic.delete_pin(&ctx.filter, PinCid(pin_cid))?;
    report_outcome(
        ctx,
        &pin,
        &format!("Deleted {}.{} from {}", pin.key.conn, pin.key.desig, pin.key.net),
    )
}

/// Rename a pin by display id.
pub fn cmd_chpin(
    ctx: &Context,
    pin_cid: usize,
    conn: &str,
    desig: &str,
) -> Result<(), WirelistError> {
    let mut ic = ctx.open()?;
    let pin = ic.rename_pin(&ctx.filter, PinCid(pin_cid), conn, desig)?;
    report_outcome(
        ctx,
        &pin,
        &format!("{}.{} on {}", pin.key.conn, pin.key.desig, pin.key.net),
    )
}

// =============================================================================
// CONDUCTORS
// =============================================================================

/// Delete a conductor.
pub fn cmd_rmcdr(ctx: &Context, cable: u64, subcdr: u64) -> Result<(), WirelistError> {
    let mut ic = ctx.open()?;
    let conductor = ic.delete_conductor(CdrId::new(cable, subcdr))?;
    report_outcome(ctx, &conductor, &format!("Deleted {}", conductor))
}

/// Change a conductor's subconductor id.
pub fn cmd_setsub(
    ctx: &Context,
    cable: u64,
    subcdr: u64,
    newsubcdr: u64,
) -> Result<(), WirelistError> {
    let mut ic = ctx.open()?;
    let conductor = ic.set_conductor_subid(CdrId::new(cable, subcdr), newsubcdr)?;
    report_outcome(ctx, &conductor, &conductor.to_string())
}

/// Change a conductor's kind.
pub fn cmd_setkind(ctx: &Context, cable: u64, subcdr: u64, kind: &str) -> Result<(), WirelistError> {
    let mut ic = ctx.open()?;
    let conductor = ic.set_conductor_kind(CdrId::new(cable, subcdr), kind)?;
    report_outcome(ctx, &conductor, &conductor.to_string())
}

// =============================================================================
// BULK MAINTENANCE
// =============================================================================

/// Renumber the nets of a unit.
pub fn cmd_renumbernets(ctx: &Context, unit: &str) -> Result<(), WirelistError> {
    let mut ic = ctx.open()?;
    let mapping = ic.renumber_nets(unit)?;
    if ctx.json_mode {
        return print_json(&mapping);
    }
    for step in mapping.iter().filter(|m| m.old != m.new) {
        println!("{}.{} -> {}.{}", unit, step.old, unit, step.new);
    }
    println!("Renumbered {} nets of {}", mapping.len(), unit);
    Ok(())
}

/// Reorient every conductor.
pub fn cmd_reorientcdrs(ctx: &Context) -> Result<(), WirelistError> {
    let mut ic = ctx.open()?;
    let summary = ic.reorient_conductors()?;
    report_outcome(
        ctx,
        &summary,
        &format!(
            "Swapped {} conductors across {} units",
            summary.swapped, summary.units
        ),
    )
}

// =============================================================================
// REPORTS
// =============================================================================

/// Print the pin report.
pub fn cmd_show(ctx: &Context) -> Result<(), WirelistError> {
    let ic = ctx.open()?;
    if ctx.json_mode {
        return print_json(&ic.pin_rows(&ctx.filter)?);
    }
    if ctx.filter.link {
        println!("{}", LINK_FILTER_BANNER);
    }
    print!("{}", ic.pin_report(&ctx.filter, &ctx.widths, true)?);
    Ok(())
}

/// Print the conductor report.
pub fn cmd_cdrcheck(ctx: &Context) -> Result<(), WirelistError> {
    let ic = ctx.open()?;
    if ctx.json_mode {
        return print_json(&ic.conductor_rows(&ctx.filter)?);
    }
    if ctx.filter.link {
        println!("{}", LINK_FILTER_BANNER);
    }
    print!("{}", ic.conductor_report(&ctx.filter, &ctx.widths)?);
    Ok(())
}

/// Write the public pin report to a file.
pub fn cmd_emit(ctx: &Context, file: &Path) -> Result<(), WirelistError> {
    let ic = ctx.open()?;
    let report = ic.pin_report(&ctx.filter, &ctx.widths, false)?;
    write_file(file, report.as_bytes())?;
    tracing::info!("wrote {}", file.display());
    Ok(())
}

/// Write the public pin report of every unit to `<prefix><unit>.il`.
pub fn cmd_massemit(ctx: &Context, prefix: &str) -> Result<(), WirelistError> {
    let ic = ctx.open()?;
    let units = ic.units()?;
    for unit in &units {
        let mut filter = ctx.filter.clone();
        filter.set_units([unit.as_str()]);
        let report = ic.pin_report(&filter, &ctx.widths, false)?;
        let path = PathBuf::from(format!(
            "{}{}.{}",
            prefix,
            unit.trim().to_lowercase(),
            EMIT_EXTENSION
        ));
        write_file(&path, report.as_bytes())?;
        tracing::info!("wrote {}", path.display());
    }
    println!("Emitted {} unit reports", units.len());
    Ok(())
}

/// List units.
pub fn cmd_units(ctx: &Context) -> Result<(), WirelistError> {
    let ic = ctx.open()?;
    let units = ic.units()?;
    if ctx.json_mode {
        return print_json(&units);
    }
    for unit in units {
        println!("{}", unit);
    }
    Ok(())
}

// =============================================================================
// EXPORT / IMPORT
// =============================================================================

/// Export every row as JSON.
pub fn cmd_export(ctx: &Context, file: &Path) -> Result<(), WirelistError> {
    let ic = ctx.open()?;
    let data = ic.export_json()?;
    write_file(file, &data)?;
    println!("Exported {} bytes to {}", data.len(), file.display());
    Ok(())
}

/// Replace every row with a JSON export.
pub fn cmd_import(ctx: &Context, file: &Path) -> Result<(), WirelistError> {
    validate_input_file(file, MAX_IMPORT_FILE_SIZE)?;
    let data = std::fs::read(file)
        .map_err(|e| WirelistError::IoError(format!("Read '{}': {}", file.display(), e)))?;

    let mut ic = ctx.open()?;
    let dataset = ic.import_json(&data)?;
    println!(
        "Imported {} nets, {} pins, {} conductors",
        dataset.net_count(),
        dataset.pin_count(),
        dataset.conductor_count()
    );
    Ok(())
}

// =============================================================================
// TESTS
// =============================================================================
