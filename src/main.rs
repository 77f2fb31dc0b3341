use clap::Parser;
use std::path::PathBuf;
use std::process;

use vmss_nmi::patch::{CpuFilter, NmiValue, PatchAction, PatchConfig};
use vmss_nmi::snapshot::Snapshot;
use vmss_nmi::stream::{TagPayload, TagRecord};
use vmss_nmi::VmssError;

#[derive(Parser)]
#[command(
    name = "vmss-nmi",
    about = "Post (or clear) a pending NMI in a VMware suspended-state file"
)]
struct Cli {
    /// Set pendingNMI only on the specified CPU
    #[arg(short, long, value_name = "CPU", default_value_t = 0)]
    cpu: u32,

    /// Display pendingNMI values but don't alter them
    #[arg(short = 'n', long, conflicts_with = "cpu")]
    dry_run: bool,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Zero out pendingNMI rather than setting it
    #[arg(short, long, conflicts_with = "dry_run")]
    zero: bool,

    /// VMSS file to process
    #[arg(value_name = "VMSS-FILE")]
    file: PathBuf,
}

fn main() {
    if let Err(err) = run(&Cli::parse()) {
        eprintln!("vmss-nmi: {err}");
        process::exit(1);
    }
}

fn run(cli: &Cli) -> Result<(), VmssError> {
    let config = PatchConfig {
        filter: if cli.dry_run {
            CpuFilter::ReportOnly
        } else {
            CpuFilter::Cpu(cli.cpu)
        },
        value: if cli.zero {
            NmiValue::Clear
        } else {
            NmiValue::Set
        },
    };

    let mut snap = Snapshot::open(&cli.file)?;

    if cli.verbose {
        println!(
            "VMSS version {}, {} groups",
            snap.header().version,
            snap.header().group_count
        );
        for (i, group) in snap.groups().iter().enumerate() {
            println!(
                "group {i:3}: {:<28} offs={:#x} size={:#x}",
                group.name_str(),
                group.offset,
                group.size
            );
        }
    }

    let mut narrate = |record: &TagRecord| {
        println!(
            "tag {:<30} size {:>3} nindx {} ([{}][{}][{}])",
            record.name,
            record.tag.value_size,
            record.tag.index_count,
            record.indices[0],
            record.indices[1],
            record.indices[2]
        );
        if let TagPayload::Block(info) = &record.payload {
            println!(
                "  block size {}, memsize {}, pad {}",
                info.size, info.mem_size, info.pad
            );
        }
    };
    let observer = if cli.verbose {
        Some(&mut narrate as &mut dyn FnMut(&TagRecord))
    } else {
        None
    };

    let reports = snap.patch_pending_nmi(&config, observer)?;

    for r in &reports {
        match r.action {
            PatchAction::Reported => {
                eprintln!("pendingNMI for CPU {} is {}", r.cpu, r.previous);
            }
            PatchAction::Skipped { target } => {
                eprintln!(
                    "pendingNMI for CPU {} is {}; skipping (target CPU is {})",
                    r.cpu, r.previous, target
                );
            }
            PatchAction::Written { new } => {
                eprintln!(
                    "pendingNMI for CPU {} is {}; setting to {}",
                    r.cpu, r.previous, new
                );
            }
        }
    }

    Ok(())
}
