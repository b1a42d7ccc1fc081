/// Interactive partition map console

use apmtool::*;
use rustyline::completion::{Completer, Pair};
use rustyline::error::ReadlineError;
use rustyline::highlight::Highlighter;
use rustyline::hint::Hinter;
use rustyline::validate::Validator;
use rustyline::{Context, Editor, Helper};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

/// Environment variable holding the log filter
const LOG_ENV: &str = "APM_LOG";

/// Command completer for the REPL
struct CommandCompleter {
    commands: Vec<&'static str>,
}

impl CommandCompleter {
    fn new() -> Self {
        Self {
            commands: vec![
                "block",
                "entry",
                "exit",
                "extract",
                "help",
                "hfs",
                "info",
                "list",
                "ls",
                "open",
                "quit",
                "relocate",
                "verify-drivers",
                "volume",
            ],
        }
    }
}

impl Completer for CommandCompleter {
    type Candidate = Pair;

    fn complete(
        &self,
        line: &str,
        pos: usize,
        _ctx: &Context<'_>,
    ) -> rustyline::Result<(usize, Vec<Pair>)> {
        // Only complete the first word (command name)
        let line_to_cursor = &line[..pos];
        if line_to_cursor.contains(' ') {
            return Ok((pos, vec![]));
        }

        let prefix = line_to_cursor.to_lowercase();
        let matches: Vec<Pair> = self
            .commands
            .iter()
            .filter(|cmd| cmd.starts_with(&prefix))
            .map(|cmd| Pair {
                display: cmd.to_string(),
                replacement: cmd.to_string(),
            })
            .collect();

        Ok((0, matches))
    }
}

impl Hinter for CommandCompleter {
    type Hint = String;
}

impl Highlighter for CommandCompleter {}
impl Validator for CommandCompleter {}
impl Helper for CommandCompleter {}

/// Get the path to the history file
fn history_path() -> Option<PathBuf> {
    dirs::home_dir().map(|mut p| {
        p.push(".apmtool_history");
        p
    })
}

/// Send library diagnostics to stderr, filtered by `APM_LOG` (default: warn)
fn init_logging() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> ExitCode {
    init_logging();

    // `apm <image>` lists the partition map and exits
    if let Some(path) = std::env::args().nth(1) {
        println!("The target disc image file is... {}", path);
        return match PartitionMap::open(&path) {
            Ok(map) => {
                print_partition_table(&map);
                ExitCode::SUCCESS
            }
            Err(e) => {
                println!("File doesn't appear to contain any partitions ({}).", e);
                ExitCode::FAILURE
            }
        };
    }

    println!("=== APM Tool ===");
    println!("Interactive console for inspecting and repairing Apple Partition Maps.");
    println!("Type 'help' for available commands\n");

    let mut rl = match Editor::new() {
        Ok(rl) => rl,
        Err(e) => {
            println!("Error: {}", e);
            return ExitCode::FAILURE;
        }
    };
    rl.set_helper(Some(CommandCompleter::new()));

    if let Some(history_path) = history_path() {
        let _ = rl.load_history(&history_path);
    }

    let mut image: Option<PathBuf> = None;

    loop {
        let input = match rl.readline("> ") {
            Ok(line) => line,
            Err(ReadlineError::Interrupted) => {
                println!("^C");
                continue;
            }
            Err(ReadlineError::Eof) => {
                if let Some(history_path) = history_path() {
                    let _ = rl.save_history(&history_path);
                }
                println!("Goodbye!");
                break;
            }
            Err(err) => {
                println!("Error: {:?}", err);
                break;
            }
        };

        let input = input.trim();
        if input.is_empty() {
            continue;
        }
        let _ = rl.add_history_entry(input);

        let parts = parse_command_line(input);
        if parts.is_empty() {
            continue;
        }
        let command = parts[0].to_lowercase();

        match command.as_str() {
            "help" => print_help(),
            "quit" | "exit" => {
                if let Some(history_path) = history_path() {
                    let _ = rl.save_history(&history_path);
                }
                println!("Goodbye!");
                break;
            }
            "open" => {
                if parts.len() < 2 {
                    println!("Usage: open <path>");
                    continue;
                }
                match verify_file(&parts[1]) {
                    Ok(kind) => {
                        println!("Opened: {} ({})", parts[1], kind);
                        if kind == ImageKind::MultiPartitionImage {
                            match partition_count(&parts[1]) {
                                Ok(count) => println!("{} entries in the partition map", count),
                                Err(e) => println!("Warning: {}", e),
                            }
                        }
                        image = Some(PathBuf::from(&parts[1]));
                    }
                    Err(e) => println!("Error: {}", e),
                }
            }
            _ => {
                let Some(path) = image.as_deref() else {
                    println!("No image loaded. Use 'open <path>' first.");
                    continue;
                };
                if let Err(e) = run_image_command(path, &command, &parts) {
                    println!("Error: {}", e);
                }
            }
        }
    }

    ExitCode::SUCCESS
}

/// Run a command that needs an open image
fn run_image_command(path: &Path, command: &str, parts: &[String]) -> Result<()> {
    match command {
        "info" => print_info(path)?,
        "list" | "ls" => print_partition_table(&PartitionMap::open(path)?),
        "entry" => {
            let Some(slot) = parts.get(1).and_then(|s| s.parse::<u32>().ok()) else {
                println!("Usage: entry <slot>");
                return Ok(());
            };
            print_entry(slot, &PartitionMap::open(path)?.entry(slot)?);
        }
        "block" => {
            let Some(index) = parts.get(1).and_then(|s| s.parse::<u32>().ok()) else {
                println!("Usage: block <index>");
                return Ok(());
            };
            let data = read_block(path, index)?;
            println!("Block {} ({} bytes):", index, data.len());
            print_hex_dump(&data, data.len());
        }
        "volume" => {
            let info = match parts.get(1).and_then(|s| s.parse::<u32>().ok()) {
                Some(slot) => PartitionMap::open(path)?.volume_info(slot)?,
                None => VolumeInfo::read(path, 0)?,
            };
            print_volume(&info);
        }
        "hfs" => println!("{} HFS partition(s)", hfs_partition_count(path)?),
        "extract" => {
            if parts.len() < 4 {
                println!("Usage: extract <start> <end> <output_path>");
                println!("  Appends partitions start..=end to output_path (slot 0 is the disc header).");
                return Ok(());
            }
            let (Ok(start), Ok(end)) = (parts[1].parse::<u32>(), parts[2].parse::<u32>()) else {
                println!("Start and end must be slot numbers.");
                return Ok(());
            };
            let result = append_partitions(path, &parts[3], start, end)?;
            println!(
                "Wrote {} partition(s), {} KB to {}",
                result.partitions,
                result.kilobytes(),
                parts[3]
            );
        }
        "relocate" => {
            if parts.len() < 3 {
                println!("Usage: relocate <from> <to> [fix] [source_path]");
                println!("  Copies entry <from> (of source_path, default the open image) into slot <to>.");
                println!("  'fix' recomputes the start sector from the preceding entry.");
                return Ok(());
            }
            let (Ok(from), Ok(to)) = (parts[1].parse::<u32>(), parts[2].parse::<u32>()) else {
                println!("From and to must be slot numbers.");
                return Ok(());
            };
            let mut fix_offset = false;
            let mut source = None;
            for arg in parts.iter().skip(3) {
                if arg.to_lowercase() == "fix" {
                    fix_offset = true;
                } else if source.is_none() {
                    source = Some(PathBuf::from(arg));
                }
            }
            let source = source.unwrap_or_else(|| path.to_path_buf());
            let result = copy_partition_block(&source, path, from, to, fix_offset)?;
            match result.fix {
                OffsetFix::Unchanged => println!("Copied entry {} to slot {}", from, to),
                OffsetFix::FromPredecessor(start) => {
                    println!("Copied entry {} to slot {}, start sector {}", from, to, start)
                }
                OffsetFix::Zeroed => {
                    println!("Copied entry {} to slot {} as the first partition", from, to)
                }
            }
            println!("Partition map now has {} entries", result.map_entries);
        }
        "verify-drivers" => {
            let Some(drivers) = parts.get(1) else {
                println!("Usage: verify-drivers <path>");
                return Ok(());
            };
            let map = verify_drivers(drivers)?;
            println!(
                "The partition map and drivers look valid ({} entries).",
                map.count()
            );
        }
        _ => println!("Unknown command: {}. Type 'help' for available commands.", command),
    }
    Ok(())
}

fn parse_command_line(input: &str) -> Vec<String> {
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;

    for ch in input.chars() {
        match ch {
            '"' => {
                in_quotes = !in_quotes;
            }
            ' ' | '\t' if !in_quotes => {
                if !current.is_empty() {
                    parts.push(current.clone());
                    current.clear();
                }
            }
            _ => {
                current.push(ch);
            }
        }
    }

    if !current.is_empty() {
        parts.push(current);
    }

    parts
}

fn print_help() {
    println!("Available commands:");
    println!("  open <path>                    - Open a disc image (use quotes for paths with spaces)");
    println!("  info                           - Show image and partition map information");
    println!("  list                           - List partition map entries (ls)");
    println!("  entry <slot>                   - Show every field of a map entry");
    println!("  block <index>                  - Hex dump a 512-byte block");
    println!("  volume [slot]                  - Show boot block and volume info (whole file if no slot)");
    println!("  hfs                            - Count Apple_HFS partitions");
    println!("  extract <start> <end> <output> - Append partitions to a file (slot 0 is the disc header)");
    println!("  relocate <from> <to> [fix] [source_path]");
    println!("                                 - Copy a map entry into another slot and renumber the map");
    println!("  verify-drivers <path>          - Check a file is a usable driver source");
    println!("  help                           - Show this help");
    println!("  quit, exit                     - Exit");
    println!();
    println!("Set {}=debug to see diagnostics.", LOG_ENV);
}

fn print_info(path: &Path) -> Result<()> {
    let kind = verify_file(path)?;
    let size = std::fs::metadata(path)?.len();
    println!("File: {}", path.display());
    println!("Format: {}", kind);
    println!("Size: {} bytes ({} blocks)", size, size / BLOCK_SIZE);

    if kind != ImageKind::MultiPartitionImage {
        return Ok(());
    }

    let scan = scan_file(path)?;
    println!("Map entries found: {}", scan.entries);
    if let Some(reported) = scan.reported {
        println!("Map entries reported: {}", reported);
    }
    println!(
        "Consistent: {}",
        if scan.is_consistent() { "Yes" } else { "No" }
    );

    if let Ok(map) = PartitionMap::open(path) {
        if let Ok(header) = map.header() {
            println!("Device blocks: {} x {} bytes", header.block_count, header.block_size);
        }
        println!("HFS partitions: {}", map.hfs_count()?);
    }
    Ok(())
}

fn print_partition_table(map: &PartitionMap) {
    println!(
        "{: >5} {: >24} {: >24} {: >8} {: >8}",
        "Num.", "Name", "Type", "Start", "Size"
    );
    for slot in map.slots() {
        let name = map.name(slot).unwrap_or_default();
        let partition_type = map.partition_type(slot).unwrap_or_default();
        let start = map.start(slot).map(|v| v.to_string()).unwrap_or_else(|_| "?".into());
        let length = map.length(slot).map(|v| v.to_string()).unwrap_or_else(|_| "?".into());
        println!(
            "{: >5} {: >24} {: >24} {: >8} {: >8}",
            slot, name, partition_type, start, length
        );
    }
}

fn print_entry(slot: u32, entry: &PartitionEntry) {
    println!("Entry {}:", slot);
    println!("  Name:        {}", entry.name);
    println!("  Type:        {}", entry.partition_type);
    println!("  Map entries: {}", entry.map_entries);
    println!("  Start:       {}", entry.start);
    println!("  Length:      {} ({} KB)", entry.length, entry.size_bytes() / 1024);
    println!("  Data start:  {}", entry.data_start);
    println!("  Data length: {}", entry.data_length);
}

fn print_volume(info: &VolumeInfo) {
    let boot = &info.boot_block;
    let mdb = &info.mdb;
    println!("Volume at sector {}", info.start);
    println!(
        "  Boot block:  {} (entry 0x{:08X}, version 0x{:04X})",
        if boot.is_bootable() { "LK" } else { "missing" },
        boot.entry,
        boot.version
    );
    println!("  Shell:       {}", boot.shell_name);
    println!("  Startup app: {}", boot.hello_name);
    if !mdb.is_hfs() {
        println!("  Not an HFS volume (signature {:02X}{:02X})", mdb.signature[0], mdb.signature[1]);
        return;
    }
    println!("  Volume name: {}", mdb.volume_name);
    println!("  Blocks:      {} ({} free)", mdb.allocation_blocks, mdb.free_blocks);
    println!("  Files:       {}", mdb.file_count);
    println!("  Created:     {} (Unix)", mdb.created_unix());
    println!("  Modified:    {} (Unix)", mdb.modified_unix());
}

fn print_hex_dump(data: &[u8], max_bytes: usize) {
    let len = data.len().min(max_bytes);

    for (i, chunk) in data[..len].chunks(16).enumerate() {
        print!("{:04X}: ", i * 16);

        for (j, byte) in chunk.iter().enumerate() {
            print!("{:02X} ", byte);
            if j == 7 {
                print!(" ");
            }
        }

        // Pad if less than 16 bytes
        for j in chunk.len()..16 {
            print!("   ");
            if j == 7 {
                print!(" ");
            }
        }

        print!(" |");
        for byte in chunk {
            let c = if *byte >= 32 && *byte < 127 {
                *byte as char
            } else {
                '.'
            };
            print!("{}", c);
        }
        println!("|");
    }

    if data.len() > max_bytes {
        println!("... ({} more bytes)", data.len() - max_bytes);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_command_line_quotes() {
        assert_eq!(
            parse_command_line(r#"open "My Disc.img""#),
            vec!["open".to_string(), "My Disc.img".to_string()]
        );
        assert_eq!(
            parse_command_line("relocate  2\t3 fix"),
            vec!["relocate", "2", "3", "fix"]
        );
    }
}
