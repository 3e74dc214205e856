//! Binary match cache for the two intermediate candidate tables.
//!
//! Reloading a cache skips the O(|A|·|B|) candidate scan.
//!
//! Format (all integers little-endian):
//! - Header (24 bytes):
//!   - Magic: "HMCACHE" (7 bytes)
//!   - Version: u8 (1 byte)
//!   - Primary halo count: u64
//!   - Secondary halo count: u64
//! - Primary list lengths: u32 per primary halo
//! - Primary list start offsets: u64 per primary halo
//! - Secondary list lengths: u32 per secondary halo
//! - Secondary list start offsets: u64 per secondary halo
//! - Records, primary block then secondary block, 16 bytes each:
//!   - Target index in the opposite catalog: u64
//!   - Goodness: f64
//!
//! Offsets count records from the start of their own block.

use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

use crate::error::CacheError;
use crate::matcher::Candidate;

/// Magic bytes for the cache format
const MAGIC: &[u8; 7] = b"HMCACHE";

/// Current format version
const VERSION: u8 = 1;

const HEADER_SIZE: usize = 24;
const RECORD_SIZE: usize = 16;

/// Tied-best candidates per halo, for both directions.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CandidateTables {
    /// Indexed by primary halo; targets index the secondary catalog.
    pub primary_best: Vec<Vec<Candidate>>,
    /// Indexed by secondary halo; targets index the primary catalog.
    pub secondary_best: Vec<Vec<Candidate>>,
}

/// Save candidate tables to a cache file
pub fn save_matches(tables: &CandidateTables, path: &Path) -> Result<(), CacheError> {
    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);
    write_matches(tables, &mut writer)?;
    writer.flush()?;
    log::info!(
        "Saved match cache ({} + {} lists) to {}",
        tables.primary_best.len(),
        tables.secondary_best.len(),
        path.display()
    );
    Ok(())
}

/// Write candidate tables in cache format
pub fn write_matches<W: Write>(tables: &CandidateTables, writer: &mut W) -> Result<(), CacheError> {
    let mut header = [0u8; HEADER_SIZE];
    header[0..7].copy_from_slice(MAGIC);
    header[7] = VERSION;
    header[8..16].copy_from_slice(&(tables.primary_best.len() as u64).to_le_bytes());
    header[16..24].copy_from_slice(&(tables.secondary_best.len() as u64).to_le_bytes());
    writer.write_all(&header)?;

    write_index(&tables.primary_best, writer)?;
    write_index(&tables.secondary_best, writer)?;

    for list in tables.primary_best.iter().chain(tables.secondary_best.iter()) {
        for c in list {
            writer.write_all(&(c.target as u64).to_le_bytes())?;
            writer.write_all(&c.goodness.to_le_bytes())?;
        }
    }
    Ok(())
}

fn write_index<W: Write>(lists: &[Vec<Candidate>], writer: &mut W) -> Result<(), CacheError> {
    let mut buf = Vec::with_capacity(lists.len() * 12);
    for list in lists {
        let len = u32::try_from(list.len())
            .map_err(|_| CacheError::InvalidFormat(format!("candidate list of {} entries", list.len())))?;
        buf.extend_from_slice(&len.to_le_bytes());
    }
    let mut start = 0u64;
    for list in lists {
        buf.extend_from_slice(&start.to_le_bytes());
        start += list.len() as u64;
    }
    writer.write_all(&buf)?;
    Ok(())
}

/// Load candidate tables from a cache file
pub fn load_matches(path: &Path) -> Result<CandidateTables, CacheError> {
    let file = File::open(path)?;
    read_matches(&mut BufReader::new(file))
}

/// Read candidate tables from a reader in cache format
pub fn read_matches<R: Read>(reader: &mut R) -> Result<CandidateTables, CacheError> {
    let mut data = Vec::new();
    reader.read_to_end(&mut data)?;
    let mut cur = Cursor { data: &data, pos: 0 };

    let header = cur.take(HEADER_SIZE)?;
    if &header[0..7] != MAGIC {
        return Err(CacheError::InvalidFormat("Invalid magic bytes".to_string()));
    }
    if header[7] != VERSION {
        return Err(CacheError::VersionMismatch {
            expected: VERSION,
            found: header[7],
        });
    }
    let n_pri = le_u64(&header[8..16]);
    let n_sec = le_u64(&header[16..24]);

    let (pri_lens, pri_starts) = read_index(&mut cur, n_pri, "primary")?;
    let (sec_lens, sec_starts) = read_index(&mut cur, n_sec, "secondary")?;

    let primary_best = read_block(&mut cur, &pri_lens, &pri_starts, n_sec, "primary")?;
    let secondary_best = read_block(&mut cur, &sec_lens, &sec_starts, n_pri, "secondary")?;

    if cur.remaining() != 0 {
        return Err(CacheError::InvalidFormat(format!(
            "{} trailing bytes after the secondary block",
            cur.remaining()
        )));
    }

    Ok(CandidateTables {
        primary_best,
        secondary_best,
    })
}

fn read_index(cur: &mut Cursor<'_>, n: u64, block: &str) -> Result<(Vec<u32>, Vec<u64>), CacheError> {
    // 12 bytes per halo: checked up front so a corrupt count cannot trigger a huge allocation
    let n = usize::try_from(n)
        .ok()
        .filter(|&n| n.checked_mul(12).is_some_and(|b| b <= cur.remaining()))
        .ok_or_else(|| CacheError::InvalidFormat(format!("{} halo count {} exceeds file size", block, n)))?;

    let lens = cur.take(n * 4)?.chunks_exact(4).map(le_u32).collect();
    let starts = cur.take(n * 8)?.chunks_exact(8).map(le_u64).collect();
    Ok((lens, starts))
}

fn read_block(
    cur: &mut Cursor<'_>,
    lens: &[u32],
    starts: &[u64],
    n_targets: u64,
    block: &str,
) -> Result<Vec<Vec<Candidate>>, CacheError> {
    let mut expected_start = 0u64;
    let mut lists = Vec::with_capacity(lens.len());

    for (i, (&len, &start)) in lens.iter().zip(starts).enumerate() {
        if start != expected_start {
            return Err(CacheError::InvalidFormat(format!(
                "{} list {} starts at {}, expected {}",
                block, i, start, expected_start
            )));
        }
        expected_start += len as u64;

        let bytes = cur.take(len as usize * RECORD_SIZE)?;
        let mut list = Vec::with_capacity(len as usize);
        for rec in bytes.chunks_exact(RECORD_SIZE) {
            let target = le_u64(&rec[0..8]);
            let goodness = f64::from_le_bytes([
                rec[8], rec[9], rec[10], rec[11], rec[12], rec[13], rec[14], rec[15],
            ]);
            if target >= n_targets {
                return Err(CacheError::InvalidFormat(format!(
                    "{} list {} targets halo {} of {}",
                    block, i, target, n_targets
                )));
            }
            if !(0.0..=100.0).contains(&goodness) {
                return Err(CacheError::InvalidFormat(format!(
                    "{} list {} has goodness {}",
                    block, i, goodness
                )));
            }
            list.push(Candidate {
                target: target as usize,
                goodness,
            });
        }
        lists.push(list);
    }
    Ok(lists)
}

struct Cursor<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn take(&mut self, n: usize) -> Result<&'a [u8], CacheError> {
        if n > self.remaining() {
            return Err(CacheError::InvalidFormat(format!(
                "truncated: needed {} bytes at offset {}, {} left",
                n,
                self.pos,
                self.remaining()
            )));
        }
        let out = &self.data[self.pos..self.pos + n];
        self.pos += n;
        Ok(out)
    }

    #[inline]
    fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }
}

#[inline]
fn le_u32(b: &[u8]) -> u32 {
    u32::from_le_bytes([b[0], b[1], b[2], b[3]])
}

#[inline]
fn le_u64(b: &[u8]) -> u64 {
    u64::from_le_bytes([b[0], b[1], b[2], b[3], b[4], b[5], b[6], b[7]])
}
