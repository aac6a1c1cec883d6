//! One register capture: optional halt, batch read, optional resume

use std::io::Write;
use tokio::io::{AsyncRead, AsyncWrite};
use tracing::{info, warn};

use crate::config::Config;
use crate::openocd_client::{OpenOcd, Result};
use crate::registers::{write_json, write_report, RegisterSnapshot};

/// Read `config.registers` from the target behind `oocd`.
///
/// Halt and resume are only sent when enabled. Resume is still attempted after
/// a failed read so a halted target is not left stopped; the read error wins.
pub async fn capture_registers<S>(oocd: &mut OpenOcd<S>, config: &Config) -> Result<RegisterSnapshot>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    if config.halt {
        oocd.halt().await?;
    }

    let read = oocd.read_registers(config.registers.as_slice(), config.force).await;

    if config.resume {
        match (&read, oocd.resume(None).await) {
            (_, Ok(_)) => {}
            (Ok(_), Err(e)) => return Err(e),
            (Err(_), Err(e)) => warn!("Resume after failed read: {}", e),
        }
    }

    let snapshot = read?;
    info!("Read {} registers", snapshot.len());
    Ok(snapshot)
}

/// Print `snapshot`, then shut the connection down.
///
/// A shutdown failure is logged only; the registers are already printed.
pub async fn report_and_close<S, W>(
    oocd: OpenOcd<S>,
    out: &mut W,
    snapshot: &RegisterSnapshot,
    json: bool,
) -> Result<()>
where
    S: AsyncRead + AsyncWrite + Unpin,
    W: Write,
{
    if json {
        write_json(out, snapshot)?;
    } else {
        write_report(out, snapshot)?;
    }

    if let Err(e) = oocd.close().await {
        warn!("Shutdown error (non-fatal): {}", e);
    }
    Ok(())
}
