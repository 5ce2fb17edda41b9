//! Pack encoder
//!
//! Serializes a set of objects into a single pack stream:
//! `b"PACK"`, version, object count, one record per object in the order
//! given, and a SHA-1 trailer over every preceding byte. Records hold either
//! a full zlib-compressed object body or a ref-delta against an earlier
//! object in the same pack.

use crate::areas::database::Database;
use crate::artifacts::objects::object_id::ObjectId;
use crate::artifacts::objects::object_type::{ObjectType, REF_DELTA_CODE};
use crate::artifacts::pack::delta;
use crate::errors::PackError;
use byteorder::{BigEndian, WriteBytesExt};
use bytes::Bytes;
use sha1::{Digest, Sha1};
use std::io::Write;

pub const PACK_MAGIC: &[u8; 4] = b"PACK";
pub const PACK_VERSION: u32 = 2;

/// A record's payload: the object in full, or a delta with its base digest.
enum Representation {
    Full,
    Delta { base: ObjectId, delta: Vec<u8> },
}

pub struct PackEncoder<'a> {
    database: &'a Database,
}

impl<'a> PackEncoder<'a> {
    pub fn new(database: &'a Database) -> Self {
        PackEncoder { database }
    }

    /// Encode the given objects, in the given order, into a pack.
    pub fn encode(&self, object_ids: &[ObjectId]) -> Result<Bytes, PackError> {
        let mut placed: Vec<(ObjectId, ObjectType, Bytes)> = Vec::with_capacity(object_ids.len());
        let mut records: Vec<(ObjectType, Representation, Vec<u8>)> =
            Vec::with_capacity(object_ids.len());

        for object_id in object_ids {
            let (object_type, body) = self.database.load_raw(object_id)?;

            let representation = Self::select_representation(object_type, &body, &placed);
            let (wire_body, representation) = match representation {
                Representation::Full => (body.to_vec(), Representation::Full),
                Representation::Delta { base, delta } => {
                    (delta.clone(), Representation::Delta { base, delta })
                }
            };

            records.push((object_type, representation, wire_body));
            placed.push((object_id.clone(), object_type, body));
        }

        let mut pack = Vec::new();
        pack.write_all(PACK_MAGIC).map_err(PackError::Compression)?;
        pack.write_u32::<BigEndian>(PACK_VERSION)
            .map_err(PackError::Compression)?;
        pack.write_u32::<BigEndian>(records.len() as u32)
            .map_err(PackError::Compression)?;

        for (object_type, representation, wire_body) in records {
            let type_code = match &representation {
                Representation::Full => object_type.pack_code(),
                Representation::Delta { .. } => REF_DELTA_CODE,
            };
            write_record_header(&mut pack, type_code, wire_body.len() as u64);

            if let Representation::Delta { base, .. } = &representation {
                base.write_h40_to(&mut pack)
                    .map_err(|_| PackError::InvalidDelta("unwritable base digest".to_string()))?;
            }

            let mut encoder =
                flate2::write::ZlibEncoder::new(&mut pack, flate2::Compression::default());
            encoder
                .write_all(&wire_body)
                .map_err(PackError::Compression)?;
            encoder.finish().map_err(PackError::Compression)?;
        }

        let mut hasher = Sha1::new();
        hasher.update(&pack);
        pack.extend_from_slice(&hasher.finalize());

        tracing::debug!(
            objects = object_ids.len(),
            bytes = pack.len(),
            "encoded pack"
        );

        Ok(Bytes::from(pack))
    }

    /// Pick the cheapest representation for one object.
    ///
    /// Only blobs and trees are delta candidates, and only against same-type
    /// objects already placed earlier in this pack. Candidates whose size
    /// differs from the target's by more than half are skipped without
    /// building a delta. A delta is kept only when it is below half the raw
    /// body size; among qualifying candidates the smallest delta wins.
    fn select_representation(
        object_type: ObjectType,
        body: &[u8],
        placed: &[(ObjectId, ObjectType, Bytes)],
    ) -> Representation {
        if object_type == ObjectType::Commit {
            return Representation::Full;
        }

        let mut best: Option<(ObjectId, Vec<u8>)> = None;
        for (base_oid, base_type, base_body) in placed {
            if *base_type != object_type {
                continue;
            }
            if base_body.len().abs_diff(body.len()) * 2 > body.len() {
                continue;
            }

            let candidate = delta::build(base_body, body);
            if candidate.len() * 2 >= body.len() {
                continue;
            }
            if best
                .as_ref()
                .is_none_or(|(_, best_delta)| candidate.len() < best_delta.len())
            {
                best = Some((base_oid.clone(), candidate));
            }
        }

        match best {
            Some((base, delta)) => Representation::Delta { base, delta },
            None => Representation::Full,
        }
    }
}

/// Record header: 3-bit type code and the payload size as a continuation-bit
/// varint. The first byte carries the type and the low 4 size bits; each
/// following byte carries 7 more size bits, little end first.
fn write_record_header(out: &mut Vec<u8>, type_code: u8, size: u64) {
    let mut first = (type_code << 4) | (size & 0x0F) as u8;
    let mut rest = size >> 4;
    if rest != 0 {
        first |= 0x80;
    }
    out.push(first);

    while rest != 0 {
        let mut byte = (rest & 0x7F) as u8;
        rest >>= 7;
        if rest != 0 {
            byte |= 0x80;
        }
        out.push(byte);
    }
}
