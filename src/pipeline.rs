//! # Transcode Pipeline Module
//!
//! Questo modulo supervisiona la coppia di processi esterni che realizza
//! una transcodifica: un decoder che scrive audio raw su stdout e un
//! encoder che legge stdin e scrive il file di destinazione. I due
//! processi sono collegati da una pipe anonima e partono insieme, così i
//! file grandi attraversano la pipe in streaming senza mai stare in
//! memoria.
//!
//! ## Supervisione:
//! - Poll non bloccante di entrambi i processi ogni 200ms
//! - Ogni exit status non-zero viene registrato per ruolo; la pipeline
//!   fallisce se la lista non è vuota (possono fallire entrambi)
//! - Budget di tempo proporzionale alla dimensione del sorgente: un
//!   minuto ogni 2 MiB, minimo un minuto
//!
//! ## Timeout:
//! - SIGTERM a ogni processo ancora vivo, poi SIGKILL, poi wait (reap)
//! - Il file di destinazione viene rimosso: è necessariamente incompleto
//!
//! Nessun retry qui: la policy di retry, se esiste, appartiene al
//! chiamante.

use crate::codecs;
use crate::error::TransferError;
use crate::media_item::MediaItem;
use std::fmt;
use std::path::Path;
use std::process::{ExitStatus, Stdio};
use std::time::{Duration, Instant};
use tokio::process::{Child, Command};
use tracing::{debug, error, info, warn};

/// How often still-running processes are polled.
const POLL_INTERVAL: Duration = Duration::from_millis(200);

/// Which half of the pipeline a process implements.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessRole {
    Decoder,
    Encoder,
}

impl fmt::Display for ProcessRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProcessRole::Decoder => write!(f, "decoder"),
            ProcessRole::Encoder => write!(f, "encoder"),
        }
    }
}

/// A process that exited non-zero (or was killed, code `None`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessFailure {
    pub role: ProcessRole,
    pub code: Option<i32>,
}

impl fmt::Display for ProcessFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.code {
            Some(code) => write!(f, "{} exited with status {}", self.role, code),
            None => write!(f, "{} was killed by a signal", self.role),
        }
    }
}

/// Outcome of one pipeline run that reached completion.
#[derive(Debug)]
pub struct PipelineResult {
    pub decoder_status: ExitStatus,
    pub encoder_status: ExitStatus,
    pub elapsed: Duration,
    /// Processes that exited non-zero, decoder first.
    pub failures: Vec<ProcessFailure>,
}

impl PipelineResult {
    pub fn succeeded(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Supervises one decoder/encoder pair per transcode.
pub struct TranscodePipeline {
    poll_interval: Duration,
}

impl TranscodePipeline {
    pub fn new() -> Self {
        Self {
            poll_interval: POLL_INTERVAL,
        }
    }

    /// Time budget for a source of `source_len` bytes: one minute per
    /// 2 MiB started, never below one minute so every run is bounded.
    pub fn budget_for(source_len: u64) -> Duration {
        const SLICE: u64 = 2 * 1024 * 1024;
        Duration::from_secs(60 * (source_len / SLICE).max(1))
    }

    /// Transcodes `item` into `output`. Fails with `UnsupportedFormat`
    /// before spawning anything when either side has no codec command.
    pub async fn run(
        &self,
        item: &MediaItem,
        target: &str,
        output: &Path,
    ) -> Result<PipelineResult, TransferError> {
        let decoder = codecs::decoder_command(item.format(), item.source())?;
        let encoder = codecs::encoder_command(target, output, item.tags())?;
        let source_len = tokio::fs::metadata(item.source()).await?.len();
        let budget = Self::budget_for(source_len);
        info!(
            "decoder: '{}', encoder: '{}'",
            decoder.join(" "),
            encoder.join(" ")
        );

        let result = self.run_commands(&decoder, &encoder, output, budget).await?;
        if !result.succeeded() {
            error!(
                "error transcoding {}: {}",
                item.source().display(),
                result
                    .failures
                    .iter()
                    .map(|f| f.to_string())
                    .collect::<Vec<_>>()
                    .join(" and ")
            );
            return Err(TransferError::Pipeline(result.failures));
        }
        Ok(result)
    }

    /// Spawns `decoder | encoder` and supervises both to completion or
    /// timeout. Non-zero exits are reported in the result, not as an
    /// error; spawn failures and timeouts are errors.
    pub async fn run_commands(
        &self,
        decoder: &[String],
        encoder: &[String],
        output: &Path,
        budget: Duration,
    ) -> Result<PipelineResult, TransferError> {
        let started = Instant::now();

        let mut dec = Command::new(&decoder[0])
            .args(&decoder[1..])
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| TransferError::ProcessSpawn {
                role: ProcessRole::Decoder,
                source: e,
            })?;

        // Hand the read end of the pipe straight to the encoder; no pipe
        // fd stays in this process.
        let dec_stdout = match dec.stdout.take() {
            Some(stdout) => stdout,
            None => {
                reap(&mut dec).await;
                return Err(TransferError::ProcessSpawn {
                    role: ProcessRole::Decoder,
                    source: std::io::Error::other("decoder stdout was not captured"),
                });
            }
        };
        let encoder_stdin: Stdio = match dec_stdout.try_into() {
            Ok(stdio) => stdio,
            Err(e) => {
                reap(&mut dec).await;
                return Err(TransferError::Io(e));
            }
        };

        let mut enc = match Command::new(&encoder[0])
            .args(&encoder[1..])
            .stdin(encoder_stdin)
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
        {
            Ok(child) => child,
            Err(e) => {
                // the decoder is already running and must be reaped
                reap(&mut dec).await;
                return Err(TransferError::ProcessSpawn {
                    role: ProcessRole::Encoder,
                    source: e,
                });
            }
        };

        let mut dec_status: Option<ExitStatus> = None;
        let mut enc_status: Option<ExitStatus> = None;
        let (decoder_status, encoder_status) = loop {
            if dec_status.is_none() {
                match dec.try_wait() {
                    Ok(status) => dec_status = status,
                    Err(e) => {
                        reap(&mut dec).await;
                        reap(&mut enc).await;
                        return Err(TransferError::Io(e));
                    }
                }
            }
            if enc_status.is_none() {
                match enc.try_wait() {
                    Ok(status) => enc_status = status,
                    Err(e) => {
                        reap(&mut dec).await;
                        reap(&mut enc).await;
                        return Err(TransferError::Io(e));
                    }
                }
            }
            if let (Some(d), Some(e)) = (dec_status, enc_status) {
                break (d, e);
            }
            if started.elapsed() >= budget {
                warn!("transcode time budget of {:?} exceeded", budget);
                if dec_status.is_none() {
                    reap(&mut dec).await;
                }
                if enc_status.is_none() {
                    reap(&mut enc).await;
                }
                // whatever the encoder wrote is incomplete
                let _ = tokio::fs::remove_file(output).await;
                return Err(TransferError::Timeout(started.elapsed()));
            }
            tokio::time::sleep(self.poll_interval).await;
        };
        let elapsed = started.elapsed();
        debug!("pipeline finished in {:?}", elapsed);

        let mut failures = Vec::new();
        for (role, status) in [
            (ProcessRole::Decoder, decoder_status),
            (ProcessRole::Encoder, encoder_status),
        ] {
            if !status.success() {
                failures.push(ProcessFailure {
                    role,
                    code: status.code(),
                });
            }
        }

        Ok(PipelineResult {
            decoder_status,
            encoder_status,
            elapsed,
            failures,
        })
    }
}

impl Default for TranscodePipeline {
    fn default() -> Self {
        Self::new()
    }
}

/// Graceful termination first, forced kill second, then wait so the
/// process is reaped either way.
async fn reap(child: &mut Child) {
    terminate(child);
    let _ = child.start_kill();
    let _ = child.wait().await;
}

#[cfg(unix)]
fn terminate(child: &Child) {
    use nix::sys::signal::{kill, Signal};
    use nix::unistd::Pid;

    if let Some(pid) = child.id() {
        let _ = kill(Pid::from_raw(pid as i32), Signal::SIGTERM);
    }
}

#[cfg(not(unix))]
fn terminate(_child: &Child) {}
