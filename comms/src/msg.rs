use std::io;

use bytes::{Buf, BufMut};

use crate::{Deserialize, Serialize};

type Header = u32;
const HEADER_SIZE: usize = size_of::<Header>();
const FLOAT_SIZE: usize = size_of::<f64>();

const KIND_ERR: Header = 0;
const KIND_CONTROL: Header = 1;
const KIND_MODEL: Header = 2;
const KIND_UPDATE: Header = 3;
const KIND_TERMINATE: Header = 4;

/// The command for the `Control` variant of the `Msg` enum.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Command {
    /// Sent by the coordinator right after dialing a participant.
    Join {
        coordinator: String,
        participant: String,
    },
}

/// A participant's statistics for a single round.
#[derive(Debug, Clone, PartialEq)]
pub struct Update {
    pub round: u64,
    /// Amount of rows in the shard that produced this update.
    pub rows: u64,
    /// Negative log-likelihood of the shard under the broadcast model.
    pub loss: f64,
    pub gradient: Vec<f64>,
    /// Row-major `gradient.len() x gradient.len()` matrix.
    pub hessian: Option<Vec<f64>>,
}

/// The application layer message for the entire system.
#[derive(Debug, Clone, PartialEq)]
pub enum Msg {
    Err(String),
    Control(Command),
    Model {
        round: u64,
        with_hessian: bool,
        weights: Vec<f64>,
    },
    Update(Update),
    Terminate {
        round: u64,
        weights: Vec<f64>,
    },
}

impl Msg {
    /// Returns a short name for this message kind, used for diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            Msg::Err(_) => "err",
            Msg::Control(_) => "control",
            Msg::Model { .. } => "data/model",
            Msg::Update(_) => "data/update",
            Msg::Terminate { .. } => "data/terminate",
        }
    }

    fn buf_is_too_small<T>(size: usize, needed: usize) -> io::Result<T> {
        Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("The given buffer is too small {size}, must at least be {needed} bytes"),
        ))
    }

    fn invalid_kind<T>(kind: Header) -> io::Result<T> {
        Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("Received an invalid kind header {kind}"),
        ))
    }
}

fn ensure(buf: &[u8], needed: usize) -> io::Result<()> {
    if buf.len() < needed {
        return Msg::buf_is_too_small(buf.len(), needed);
    }

    Ok(())
}

fn put_floats(buf: &mut Vec<u8>, nums: &[f64]) {
    buf.put_u64(nums.len() as u64);
    buf.put_slice(bytemuck::cast_slice(nums));
}

fn get_floats(buf: &mut &[u8], count: usize) -> io::Result<Vec<f64>> {
    let bytes = count.checked_mul(FLOAT_SIZE).ok_or_else(|| {
        io::Error::new(
            io::ErrorKind::InvalidData,
            format!("Float count {count} overflows"),
        )
    })?;

    ensure(buf, bytes)?;
    // `pod_collect_to_vec` copies, the frame buffer has no alignment guarantees.
    let nums = bytemuck::pod_collect_to_vec(&buf[..bytes]);
    buf.advance(bytes);
    Ok(nums)
}

fn get_sized_floats(buf: &mut &[u8]) -> io::Result<Vec<f64>> {
    ensure(buf, size_of::<u64>())?;
    let count = buf.get_u64() as usize;
    get_floats(buf, count)
}

impl Serialize for Msg {
    fn serialize(&self, buf: &mut Vec<u8>) -> io::Result<()> {
        match self {
            Msg::Err(detail) => {
                buf.put_u32(KIND_ERR);
                buf.put_slice(detail.as_bytes());
            }
            Msg::Control(cmd) => {
                buf.put_u32(KIND_CONTROL);
                serde_json::to_writer(&mut *buf, cmd)?;
            }
            Msg::Model {
                round,
                with_hessian,
                weights,
            } => {
                buf.put_u32(KIND_MODEL);
                buf.put_u64(*round);
                buf.put_u8(*with_hessian as u8);
                put_floats(buf, weights);
            }
            Msg::Update(update) => {
                let dim = update.gradient.len();

                if let Some(hessian) = &update.hessian
                    && hessian.len() != dim * dim
                {
                    return Err(io::Error::new(
                        io::ErrorKind::InvalidInput,
                        format!(
                            "Hessian has {} entries, expected {} for a gradient of length {dim}",
                            hessian.len(),
                            dim * dim
                        ),
                    ));
                }

                buf.put_u32(KIND_UPDATE);
                buf.put_u64(update.round);
                buf.put_u64(update.rows);
                buf.put_f64(update.loss);
                put_floats(buf, &update.gradient);

                match &update.hessian {
                    Some(hessian) => {
                        buf.put_u8(1);
                        buf.put_slice(bytemuck::cast_slice(hessian));
                    }
                    None => buf.put_u8(0),
                }
            }
            Msg::Terminate { round, weights } => {
                buf.put_u32(KIND_TERMINATE);
                buf.put_u64(*round);
                put_floats(buf, weights);
            }
        }

        Ok(())
    }
}

impl Deserialize for Msg {
    fn deserialize(mut buf: &[u8]) -> io::Result<Self> {
        ensure(buf, HEADER_SIZE)?;
        let kind = buf.get_u32();

        let msg = match kind {
            KIND_ERR => {
                let detail = std::str::from_utf8(buf)
                    .map_err(|err| io::Error::new(io::ErrorKind::InvalidData, err))?;

                Msg::Err(detail.to_string())
            }
            KIND_CONTROL => {
                let cmd = serde_json::from_slice(buf)?;
                Msg::Control(cmd)
            }
            KIND_MODEL => {
                ensure(buf, size_of::<u64>() + 1)?;
                let round = buf.get_u64();
                let with_hessian = buf.get_u8() != 0;
                let weights = get_sized_floats(&mut buf)?;

                Msg::Model {
                    round,
                    with_hessian,
                    weights,
                }
            }
            KIND_UPDATE => {
                ensure(buf, 3 * size_of::<u64>())?;
                let round = buf.get_u64();
                let rows = buf.get_u64();
                let loss = buf.get_f64();
                let gradient = get_sized_floats(&mut buf)?;

                ensure(buf, 1)?;
                let hessian = match buf.get_u8() {
                    0 => None,
                    _ => {
                        let dim = gradient.len();
                        let count = dim.checked_mul(dim).ok_or_else(|| {
                            io::Error::new(io::ErrorKind::InvalidData, "Hessian size overflows")
                        })?;

                        Some(get_floats(&mut buf, count)?)
                    }
                };

                Msg::Update(Update {
                    round,
                    rows,
                    loss,
                    gradient,
                    hessian,
                })
            }
            KIND_TERMINATE => {
                ensure(buf, size_of::<u64>())?;
                let round = buf.get_u64();
                let weights = get_sized_floats(&mut buf)?;

                Msg::Terminate { round, weights }
            }
            kind => return Self::invalid_kind(kind),
        };

        Ok(msg)
    }
}
