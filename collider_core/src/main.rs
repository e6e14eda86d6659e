use collider_core::frame::compose_with_leading_crc;
use collider_core::record::ConfigRecord;

use std::io::Write;

fn main() -> Result<(), anyhow::Error> {
    let record = ConfigRecord::new(1_000_000, 50, 127);
    let frame = compose_with_leading_crc(&record);
    eprintln!("composed seed record:\n{record}");
    let mut stdout = std::io::stdout().lock();
    stdout.write_all(&frame)?;
    stdout.flush()?;
    Ok(())
}
