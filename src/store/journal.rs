//! Append-only journal-backed order store.
//!
//! Records are bincode-encoded [`StoredOrder`]s framed as
//! `[len: u32 LE][payload][crc32c(payload): u32 LE]` in a single
//! `orders.log` file under the data directory. Each batch is coalesced
//! into one buffer, written and fsynced in a single pass, and only then
//! published to the in-memory arrival-ordered index that serves queries.
//! The file length of the last successful batch is tracked so a failed
//! write can be rolled back and retried without corrupting the log.
//!
//! On open the journal is replayed to rebuild the index and the id
//! counter. A torn or corrupt tail (a partial write from a crash) fails
//! length or checksum validation; replay stops there and the file is
//! truncated to the valid prefix so appends resume cleanly.

use std::fs::{self, File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use tracing::{debug, info, warn};

use crate::error::Error;
use crate::store::{OrderStore, PriceBand};
use crate::types::{Order, OrderId, Side, StoredOrder};

/// Journal file name within the data directory
const JOURNAL_FILE: &str = "orders.log";

/// Frame overhead: length prefix plus checksum suffix
const FRAME_OVERHEAD: usize = 8;

/// Upper bound on one record's encoded size; a larger length prefix is
/// treated as corruption
const MAX_RECORD_BYTES: u32 = 1 << 20;

struct Writer {
    file: File,
    next_id: OrderId,
    /// File length as of the last successful batch
    committed_len: u64,
}

/// File-backed implementation of [`OrderStore`]
///
/// Cheap to share behind an `Arc`; the writer is serialized by a mutex
/// while queries read a separate index under a read-write lock.
pub struct JournalStore {
    path: PathBuf,
    writer: Mutex<Writer>,
    index: RwLock<Vec<StoredOrder>>,
}

impl JournalStore {
    /// Open or create a journal under `dir`
    ///
    /// Creates the directory on first use, replays any existing journal,
    /// and truncates a torn tail.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] when the directory or journal file cannot be
    /// created or read.
    pub fn open(dir: impl AsRef<Path>) -> Result<Self, Error> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir)?;
        let path = dir.join(JOURNAL_FILE);

        let (records, valid_len) = replay(&path)?;
        let next_id = records.last().map_or(1, |record| record.id + 1);

        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .open(&path)?;
        let file_len = file.metadata()?.len();
        if file_len > valid_len {
            warn!(
                dropped_bytes = file_len - valid_len,
                path = %path.display(),
                "truncating torn journal tail"
            );
            file.set_len(valid_len)?;
        }
        file.seek(SeekFrom::End(0))?;

        info!(
            records = records.len(),
            next_id,
            path = %path.display(),
            "journal opened"
        );
        Ok(Self {
            path,
            writer: Mutex::new(Writer {
                file,
                next_id,
                committed_len: valid_len,
            }),
            index: RwLock::new(records),
        })
    }

    /// Path of the journal file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of persisted orders
    pub fn len(&self) -> usize {
        self.index.read().len()
    }

    /// Check if the journal holds no orders
    pub fn is_empty(&self) -> bool {
        self.index.read().is_empty()
    }
}

#[async_trait]
impl OrderStore for JournalStore {
    async fn insert_batch(&self, orders: &[Order]) -> Result<Vec<OrderId>, Error> {
        if orders.is_empty() {
            return Ok(Vec::new());
        }

        let mut writer = self.writer.lock();

        // Roll back any partial bytes left by a previously failed write
        let current_len = writer.file.metadata()?.len();
        if current_len != writer.committed_len {
            writer.file.set_len(writer.committed_len)?;
            writer.file.seek(SeekFrom::End(0))?;
        }

        let first_id = writer.next_id;
        let mut records = Vec::with_capacity(orders.len());
        let mut frames = Vec::new();
        for (i, order) in orders.iter().enumerate() {
            let record = StoredOrder::from_order(first_id + i as u64, order.clone());
            encode_frame(&record, &mut frames)?;
            records.push(record);
        }

        writer.file.write_all(&frames)?;
        writer.file.sync_all()?;
        writer.committed_len += frames.len() as u64;
        writer.next_id = first_id + orders.len() as u64;
        drop(writer);

        let ids: Vec<OrderId> = records.iter().map(|record| record.id).collect();
        self.index.write().extend(records);

        debug!(
            count = orders.len(),
            first_id,
            "batch appended to journal"
        );
        Ok(ids)
    }

    async fn query_by_side(
        &self,
        symbol: &str,
        side: Side,
        band: Option<PriceBand>,
    ) -> Result<Vec<StoredOrder>, Error> {
        let index = self.index.read();
        Ok(index
            .iter()
            .filter(|order| order.side == side && order.symbol == symbol)
            .filter(|order| band.map_or(true, |b| b.contains(order.price)))
            .cloned()
            .collect())
    }
}

/// Append one framed record to `out`
fn encode_frame(record: &StoredOrder, out: &mut Vec<u8>) -> Result<(), Error> {
    let payload = bincode::serialize(record)?;
    out.extend_from_slice(&(payload.len() as u32).to_le_bytes());
    out.extend_from_slice(&payload);
    out.extend_from_slice(&crc32c::crc32c(&payload).to_le_bytes());
    Ok(())
}

/// Decode one frame starting at `offset` within `data`
///
/// Returns the record and the frame's total length in bytes.
fn decode_frame(data: &[u8], offset: usize) -> Result<(StoredOrder, usize), Error> {
    let buf = &data[offset..];
    if buf.len() < 4 {
        return Err(corrupt(offset, "truncated length prefix"));
    }
    let len = u32::from_le_bytes([buf[0], buf[1], buf[2], buf[3]]);
    if len == 0 || len > MAX_RECORD_BYTES {
        return Err(corrupt(offset, "implausible record length"));
    }
    let len = len as usize;
    let frame_len = len + FRAME_OVERHEAD;
    if buf.len() < frame_len {
        return Err(corrupt(offset, "truncated record"));
    }

    let payload = &buf[4..4 + len];
    let stored_crc = u32::from_le_bytes([
        buf[4 + len],
        buf[5 + len],
        buf[6 + len],
        buf[7 + len],
    ]);
    if crc32c::crc32c(payload) != stored_crc {
        return Err(corrupt(offset, "checksum mismatch"));
    }

    let record: StoredOrder = bincode::deserialize(payload)?;
    Ok((record, frame_len))
}

fn corrupt(offset: usize, detail: &str) -> Error {
    Error::CorruptFrame {
        offset: offset as u64,
        detail: detail.to_string(),
    }
}

/// Read every valid frame from the journal, stopping at the first invalid
/// one
///
/// Returns the records and the byte length of the valid prefix.
fn replay(path: &Path) -> Result<(Vec<StoredOrder>, u64), Error> {
    let mut file = match File::open(path) {
        Ok(file) => file,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            return Ok((Vec::new(), 0));
        }
        Err(err) => return Err(err.into()),
    };
    let mut data = Vec::new();
    file.read_to_end(&mut data)?;

    let mut records = Vec::new();
    let mut pos = 0usize;
    while pos < data.len() {
        match decode_frame(&data, pos) {
            Ok((record, frame_len)) => {
                records.push(record);
                pos += frame_len;
            }
            Err(err) => {
                warn!(
                    offset = pos,
                    error = %err,
                    "journal replay stopped at invalid frame"
                );
                break;
            }
        }
    }
    Ok((records, pos as u64))
}
