use std::io::Write;

use crate::errors::Result;
use crate::runner::outcome::RunResults;
use crate::utils::writer::Writer;

/// Writes `results` as pretty printed JSON, every log included.
pub fn write_json(results: &RunResults, writer: &mut Writer) -> Result<()> {
    serde_json::to_writer_pretty(&mut *writer, results)?;
    writeln!(writer)?;
    Ok(())
}
