use crate::cli::InspectArgs;
use crate::error::Result;
use paramforge::core::forcefield::config::DEFAULT_PHASE_TOLERANCE;
use paramforge::core::forcefield::parameters::{SignedExportPolicy, SignedTable};
use paramforge::core::io::record::MolRecord;
use paramforge::core::models::ids::AtomId;
use std::io::{self, Write};
use tracing::info;

pub fn run(args: InspectArgs) -> Result<()> {
    info!("Reading record from {:?}", &args.record);
    let record = MolRecord::read_from_path(&args.record)?;
    let mut stdout = io::stdout().lock();
    describe(&record, &args, &mut stdout)?;
    stdout.flush()?;
    Ok(())
}

fn describe(record: &MolRecord, args: &InspectArgs, out: &mut impl Write) -> Result<()> {
    let params = &record.parameters;
    writeln!(out, "Molecule: {}", record.mol_id)?;
    writeln!(out, "  atoms: {}", record.atom_count())?;
    writeln!(out, "  conformers: {}", record.conformer_count())?;
    writeln!(
        out,
        "  partial charges: {}",
        if record.partial_charges.is_some() { "yes" } else { "no" }
    )?;
    writeln!(out, "  bonds: {}", params.bonds().len())?;
    writeln!(out, "  angles: {}", params.angles().len())?;
    writeln!(
        out,
        "  propers: {} x {}",
        params.propers().len(),
        params.proper_table().n_periodicity()
    )?;
    writeln!(
        out,
        "  impropers: {} x {}",
        params.impropers().len(),
        params.improper_table().n_periodicity()
    )?;
    if params.has_missing() {
        writeln!(out, "  (some parameters are missing)")?;
    }

    if args.signed {
        let policy = if args.allow_missing {
            SignedExportPolicy::AllowMissing
        } else {
            SignedExportPolicy::Strict
        };
        let propers =
            params.signed_proper_ks(DEFAULT_PHASE_TOLERANCE, policy, args.periodicity)?;
        let impropers =
            params.signed_improper_ks(DEFAULT_PHASE_TOLERANCE, policy, args.periodicity)?;
        write_signed(out, "Signed proper force constants", params.propers(), &propers)?;
        write_signed(
            out,
            "Signed improper force constants",
            params.impropers(),
            &impropers,
        )?;
    }
    Ok(())
}

fn write_signed(
    out: &mut impl Write,
    title: &str,
    tuples: &[[AtomId; 4]],
    table: &SignedTable,
) -> io::Result<()> {
    writeln!(out, "{title}:")?;
    for (row, tuple) in tuples.iter().enumerate() {
        let ids: Vec<String> = tuple.iter().map(ToString::to_string).collect();
        let values: Vec<String> = table
            .row(row)
            .iter()
            .map(|v| v.map_or_else(|| "-".to_string(), |k| format!("{k:.4}")))
            .collect();
        writeln!(out, "  ({}): {}", ids.join(", "), values.join(" "))?;
    }
    Ok(())
}
