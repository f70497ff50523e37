use byteorder::{LittleEndian, WriteBytesExt};
use std::io;

use crate::bitmap::store::Store;
use crate::RoaringBitmap;

// Container shape tags, stored in the two high bits of the shape-and-offset
// header word; the low 30 bits hold the payload byte offset.
pub const SHAPE_ARRAY: u32 = 0;
pub const SHAPE_BITMAP: u32 = 1;
pub const SHAPE_INVERTED: u32 = 2;
pub const SHAPE_SHIFT: u32 = 30;
pub const OFFSET_MASK: u32 = (1 << SHAPE_SHIFT) - 1;

/// Alignment of the payload region following the header.
pub const REGION_ALIGN: usize = 32;
/// Alignment of array and inverted payloads.
pub const VALUES_ALIGN: usize = 4;
/// Alignment of bitmap payloads, read as 64-bit words.
pub const WORDS_ALIGN: usize = 8;

pub const COUNT_BYTES: usize = 4;
pub const DESCRIPTION_BYTES: usize = 12;

#[inline]
pub fn align_up(offset: usize, align: usize) -> usize {
    (offset + align - 1) / align * align
}

/// Byte length of the header for `n_keys` containers, before padding.
#[inline]
pub fn header_len(n_keys: usize) -> usize {
    COUNT_BYTES + n_keys * DESCRIPTION_BYTES
}

#[inline]
pub fn shape_of(store: &Store) -> u32 {
    match store {
        Store::Array(..) => SHAPE_ARRAY,
        Store::Bitmap(..) => SHAPE_BITMAP,
        Store::Inverted(..) => SHAPE_INVERTED,
    }
}

#[inline]
fn payload_align(store: &Store) -> usize {
    match store {
        Store::Bitmap(..) => WORDS_ALIGN,
        _ => VALUES_ALIGN,
    }
}

#[inline]
fn payload_len(store: &Store) -> usize {
    match store {
        Store::Array(vec) => vec.len() as usize * 2,
        Store::Bitmap(..) => crate::bitmap::store::BITMAP_BYTES,
        Store::Inverted(inv) => inv.absent().len() as usize * 2,
    }
}

impl RoaringBitmap {
    /// Return the size in bytes of the frozen form, the exact length of the
    /// buffer [`freeze`](RoaringBitmap::freeze) produces.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use roaring_pack::RoaringBitmap;
    ///
    /// let rb: RoaringBitmap = (1..4).collect();
    /// assert_eq!(rb.freeze().len(), rb.serialized_size());
    /// ```
    pub fn serialized_size(&self) -> usize {
        let mut offset = align_up(header_len(self.containers().len()), REGION_ALIGN);
        for container in self.containers() {
            offset = align_up(offset, payload_align(&container.store));
            offset += payload_len(&container.store);
        }
        offset
    }

    /// Serialize this bitmap into the frozen layout: a header of keys,
    /// cardinalities and payload offsets, then the aligned container
    /// payloads. The resulting bytes are the in-memory form of
    /// [`FrozenBitmap`](crate::FrozenBitmap) and can be queried without
    /// copying, including over a memory-mapped file.
    ///
    /// Freezing the same bitmap twice produces byte-identical buffers.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use roaring_pack::{FrozenBitmap, RoaringBitmap};
    ///
    /// let rb1: RoaringBitmap = (1..4).collect();
    /// let frozen = FrozenBitmap::from_bytes(rb1.freeze()).unwrap();
    /// let rb2 = frozen.to_roaring();
    ///
    /// assert_eq!(rb1, rb2);
    /// ```
    pub fn freeze(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(self.serialized_size());
        self.freeze_into(&mut bytes).expect("writing to a vec cannot fail");
        debug_assert_eq!(bytes.len(), self.serialized_size());
        bytes
    }

    /// Serialize the frozen layout into the given writer.
    /// See [`freeze`](RoaringBitmap::freeze).
    pub fn freeze_into<W: io::Write>(&self, mut writer: W) -> io::Result<()> {
        let containers = self.containers();
        writer.write_u32::<LittleEndian>(containers.len() as u32)?;

        for container in containers {
            writer.write_u32::<LittleEndian>(u32::from(container.key))?;
        }
        for container in containers {
            writer.write_u32::<LittleEndian>((container.len() - 1) as u32)?;
        }

        let region_start = align_up(header_len(containers.len()), REGION_ALIGN);
        let mut offset = region_start;
        for container in containers {
            offset = align_up(offset, payload_align(&container.store));
            writer
                .write_u32::<LittleEndian>((shape_of(&container.store) << SHAPE_SHIFT) | offset as u32)?;
            offset += payload_len(&container.store);
        }

        let mut position = header_len(containers.len());
        write_zeros(&mut writer, region_start - position)?;
        position = region_start;

        for container in containers {
            let aligned = align_up(position, payload_align(&container.store));
            write_zeros(&mut writer, aligned - position)?;
            position = aligned + payload_len(&container.store);

            match &container.store {
                Store::Array(vec) => {
                    for &value in vec.iter() {
                        writer.write_u16::<LittleEndian>(value)?;
                    }
                }
                Store::Bitmap(bits) => {
                    for &word in bits.as_array() {
                        writer.write_u64::<LittleEndian>(word)?;
                    }
                }
                Store::Inverted(inv) => {
                    for &value in inv.absent().iter() {
                        writer.write_u16::<LittleEndian>(value)?;
                    }
                }
            }
        }

        Ok(())
    }
}

fn write_zeros<W: io::Write>(writer: &mut W, count: usize) -> io::Result<()> {
    const ZEROS: [u8; REGION_ALIGN] = [0; REGION_ALIGN];
    debug_assert!(count <= ZEROS.len());
    writer.write_all(&ZEROS[..count])
}
