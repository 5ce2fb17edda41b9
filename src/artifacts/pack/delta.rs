//! Binary delta codec
//!
//! A delta rewrites a target object as instructions against a base object:
//! `copy` instructions reuse byte ranges of the base, `insert` instructions
//! carry literal bytes. The stream opens with the base and target sizes as
//! continuation-bit varints, so application can validate both ends.
//!
//! The contract is exact reconstruction: for any base and target,
//! `apply(base, build(base, target))` yields the target byte-for-byte.

use crate::errors::PackError;
use std::collections::HashMap;

/// Shortest base run worth a copy instruction. Runs of 4 bytes or fewer cost
/// as much to reference as to insert.
const MIN_COPY_LEN: usize = 5;

/// Longest span a single copy instruction can express (two size bytes).
const MAX_COPY_LEN: usize = 0xFFFF;

/// Longest literal a single insert instruction can carry.
const MAX_INSERT_LEN: usize = 127;

/// How many candidate base positions to try per target offset before settling
/// for the best seen. Bounds pathological inputs full of repeated seeds.
const MAX_CHAIN: usize = 64;

const SEED_LEN: usize = 4;

/// Encode `target` as a delta against `base`.
///
/// Greedy single pass over the target: at each position the longest base run
/// of at least [`MIN_COPY_LEN`] bytes becomes a copy, everything in between
/// becomes inserts. Not guaranteed minimal.
pub fn build(base: &[u8], target: &[u8]) -> Vec<u8> {
    let mut delta = Vec::new();
    write_varint(&mut delta, base.len() as u64);
    write_varint(&mut delta, target.len() as u64);

    let seeds = index_seeds(base);

    let mut literal_start = 0;
    let mut pos = 0;
    while pos < target.len() {
        match longest_match(base, target, pos, &seeds) {
            Some((offset, len)) => {
                flush_inserts(&mut delta, &target[literal_start..pos]);
                write_copies(&mut delta, offset, len);
                pos += len;
                literal_start = pos;
            }
            None => pos += 1,
        }
    }
    flush_inserts(&mut delta, &target[literal_start..]);

    delta
}

/// Reconstruct a target from its base and delta.
///
/// Rejects deltas whose declared base size disagrees with the base given,
/// whose instructions reach outside the base, or whose output does not match
/// the declared target size.
pub fn apply(base: &[u8], delta: &[u8]) -> Result<Vec<u8>, PackError> {
    let mut cursor = 0;
    let declared_base = read_varint(delta, &mut cursor)? as usize;
    let declared_target = read_varint(delta, &mut cursor)? as usize;

    if declared_base != base.len() {
        return Err(PackError::InvalidDelta(format!(
            "delta expects a {declared_base}-byte base, got {} bytes",
            base.len()
        )));
    }

    let mut target = Vec::with_capacity(declared_target);
    while cursor < delta.len() {
        let opcode = delta[cursor];
        cursor += 1;

        if opcode & 0x80 != 0 {
            let (offset, len) = read_copy_operands(delta, &mut cursor, opcode)?;
            let end = offset
                .checked_add(len)
                .filter(|&end| end <= base.len())
                .ok_or_else(|| {
                    PackError::InvalidDelta(format!(
                        "copy of {len} bytes at offset {offset} overruns {}-byte base",
                        base.len()
                    ))
                })?;
            target.extend_from_slice(&base[offset..end]);
        } else if opcode != 0 {
            let len = opcode as usize;
            let literal = delta.get(cursor..cursor + len).ok_or_else(|| {
                PackError::InvalidDelta("insert literal is truncated".to_string())
            })?;
            target.extend_from_slice(literal);
            cursor += len;
        } else {
            return Err(PackError::InvalidDelta(
                "reserved zero opcode".to_string(),
            ));
        }
    }

    if target.len() != declared_target {
        return Err(PackError::InvalidDelta(format!(
            "delta declared {declared_target} target bytes but produced {}",
            target.len()
        )));
    }

    Ok(target)
}

/// Map every [`SEED_LEN`]-byte window of the base to its starting offsets.
fn index_seeds(base: &[u8]) -> HashMap<&[u8], Vec<usize>> {
    let mut seeds: HashMap<&[u8], Vec<usize>> = HashMap::new();
    for offset in 0..base.len().saturating_sub(SEED_LEN - 1) {
        seeds
            .entry(&base[offset..offset + SEED_LEN])
            .or_default()
            .push(offset);
    }
    seeds
}

/// Longest base run matching the target at `pos`, if it reaches
/// [`MIN_COPY_LEN`].
fn longest_match(
    base: &[u8],
    target: &[u8],
    pos: usize,
    seeds: &HashMap<&[u8], Vec<usize>>,
) -> Option<(usize, usize)> {
    let seed = target.get(pos..pos + SEED_LEN)?;
    let candidates = seeds.get(seed)?;

    let mut best: Option<(usize, usize)> = None;
    for &offset in candidates.iter().rev().take(MAX_CHAIN) {
        let len = base[offset..]
            .iter()
            .zip(&target[pos..])
            .take_while(|(b, t)| b == t)
            .count();
        if len >= MIN_COPY_LEN && best.is_none_or(|(_, best_len)| len > best_len) {
            best = Some((offset, len));
        }
    }
    best
}

/// Emit insert instructions for a literal run, split at the 127-byte cap.
fn flush_inserts(delta: &mut Vec<u8>, literal: &[u8]) {
    for chunk in literal.chunks(MAX_INSERT_LEN) {
        delta.push(chunk.len() as u8);
        delta.extend_from_slice(chunk);
    }
}

/// Emit copy instructions for a base run, split at the per-instruction cap.
///
/// The opcode sets one flag bit per operand byte present; zero-valued operand
/// bytes are omitted from the stream.
fn write_copies(delta: &mut Vec<u8>, mut offset: usize, mut len: usize) {
    while len > 0 {
        let chunk = len.min(MAX_COPY_LEN);

        let mut opcode = 0x80u8;
        let mut operands = Vec::with_capacity(6);
        for (bit, byte) in (0..4).map(|i| (1u8 << i, (offset >> (8 * i)) as u8)) {
            if byte != 0 {
                opcode |= bit;
                operands.push(byte);
            }
        }
        for (bit, byte) in (0..2).map(|i| (1u8 << (4 + i), (chunk >> (8 * i)) as u8)) {
            if byte != 0 {
                opcode |= bit;
                operands.push(byte);
            }
        }

        delta.push(opcode);
        delta.extend_from_slice(&operands);

        offset += chunk;
        len -= chunk;
    }
}

/// Decode the operand bytes the copy opcode's flag bits announce.
fn read_copy_operands(
    delta: &[u8],
    cursor: &mut usize,
    opcode: u8,
) -> Result<(usize, usize), PackError> {
    let mut next_byte = |err: &str| -> Result<usize, PackError> {
        let byte = *delta
            .get(*cursor)
            .ok_or_else(|| PackError::InvalidDelta(err.to_string()))?;
        *cursor += 1;
        Ok(byte as usize)
    };

    let mut offset = 0;
    for i in 0..4 {
        if opcode & (1 << i) != 0 {
            offset |= next_byte("copy offset is truncated")? << (8 * i);
        }
    }

    let mut len = 0;
    for i in 0..2 {
        if opcode & (1 << (4 + i)) != 0 {
            len |= next_byte("copy length is truncated")? << (8 * i);
        }
    }
    if len == 0 {
        len = 0x10000;
    }

    Ok((offset, len))
}

/// Append `value` as a continuation-bit varint, 7 bits per byte, little end
/// first.
pub(crate) fn write_varint(out: &mut Vec<u8>, mut value: u64) {
    loop {
        let mut byte = (value & 0x7F) as u8;
        value >>= 7;
        if value != 0 {
            byte |= 0x80;
        }
        out.push(byte);
        if value == 0 {
            break;
        }
    }
}

fn read_varint(data: &[u8], cursor: &mut usize) -> Result<u64, PackError> {
    let mut value = 0u64;
    let mut shift = 0;
    loop {
        let byte = *data
            .get(*cursor)
            .ok_or_else(|| PackError::InvalidDelta("varint is truncated".to_string()))?;
        *cursor += 1;

        value |= u64::from(byte & 0x7F) << shift;
        if byte & 0x80 == 0 {
            return Ok(value);
        }

        shift += 7;
        if shift > 63 {
            return Err(PackError::InvalidDelta("varint overflows u64".to_string()));
        }
    }
}
