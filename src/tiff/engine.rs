//! TIFF file engine
//!
//! One engine owns one file: it parses or emits the header, walks the
//! IFD chain, and moves tile bytes in and out. Everything above it
//! (read maps, write maps, the copier) goes through the engine for
//! file access; the engine serializes that access behind a single file
//! lock. Codec work never runs under the lock.
//!
//! The engine is thread-safe for reads. Writing is single-writer: a
//! write map and its engine must be driven from one thread at a time,
//! or serialised externally.

use std::collections::HashSet;
use std::fs::{File, OpenOptions};
use std::io::{Cursor, Read, Seek, SeekFrom, Write};
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use log::{debug, info, warn};

use crate::compression::CodecRegistry;
use crate::config::TiffOptions;
use crate::io::byte_order::{ByteOrder, ByteOrderHandler};
use crate::kind::{self, ImageKind};
use crate::map::read_map::ReadMap;
use crate::map::write_map::WriteMap;
use crate::tiff::constants::{field_types, header};
use crate::tiff::errors::{TiffError, TiffResult};
use crate::tiff::ifd::Ifd;
use crate::tiff::value::{field_type_size, Value};
use crate::tile::cache::TileCache;

/// Process-wide source of cache fingerprints
///
/// Each image opened by any engine gets a distinct fingerprint so
/// engines may share one cache without key collisions.
static NEXT_FINGERPRINT: AtomicU64 = AtomicU64::new(1);

fn next_fingerprint() -> u64 {
    NEXT_FINGERPRINT.fetch_add(1, Ordering::Relaxed)
}

/// Read/write engine over one TIFF or BigTIFF file
pub struct TiffEngine {
    /// The file lock: every header, IFD and tile byte transfer takes it
    file: Mutex<File>,
    handler: Box<dyn ByteOrderHandler>,
    byte_order: ByteOrder,
    big_tiff: bool,
    writable: bool,
    options: TiffOptions,
    registry: Arc<CodecRegistry>,
    cache: Arc<TileCache>,
    /// Images read from an existing file
    ifds: Vec<Arc<Ifd>>,
    /// Cache fingerprint per image
    fingerprints: Vec<u64>,
    /// Writer state: file position of the pointer that the next
    /// committed IFD must be linked into
    next_link_pos: Mutex<u64>,
    /// IFDs committed through write maps, in commit order
    written_ifds: Mutex<Vec<Arc<Ifd>>>,
}

impl TiffEngine {
    /// Opens an existing file for reading
    pub fn open(path: impl AsRef<Path>, options: TiffOptions) -> TiffResult<Self> {
        let path = path.as_ref();
        info!("Opening TIFF file: {}", path.display());
        let file = File::open(path)?;
        Self::from_file(file, false, options)
    }

    /// Creates a new file for writing and emits the header
    pub fn create(path: impl AsRef<Path>, options: TiffOptions) -> TiffResult<Self> {
        let path = path.as_ref();
        info!(
            "Creating {} file: {}",
            if options.big_tiff { "BigTIFF" } else { "TIFF" },
            path.display()
        );

        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)?;

        let byte_order = if options.little_endian {
            ByteOrder::LittleEndian
        } else {
            ByteOrder::BigEndian
        };
        let handler = byte_order.create_handler();

        file.write_all(&byte_order.marker())?;
        if options.big_tiff {
            handler.write_u16(&mut file, header::BIG_TIFF_VERSION)?;
            handler.write_u16(&mut file, header::BIGTIFF_OFFSET_SIZE)?;
            handler.write_u16(&mut file, 0)?;
            handler.write_u64(&mut file, 0)?; // first IFD offset, patched later
        } else {
            handler.write_u16(&mut file, header::TIFF_VERSION)?;
            handler.write_u32(&mut file, 0)?; // first IFD offset, patched later
        }
        file.flush()?;

        let link_pos = if options.big_tiff { 8 } else { 4 };
        let cache = Arc::new(TileCache::new(options.max_caching_memory));

        Ok(TiffEngine {
            file: Mutex::new(file),
            handler,
            byte_order,
            big_tiff: options.big_tiff,
            writable: true,
            options,
            registry: Arc::new(CodecRegistry::with_builtins()),
            cache,
            ifds: Vec::new(),
            fingerprints: Vec::new(),
            next_link_pos: Mutex::new(link_pos),
            written_ifds: Mutex::new(Vec::new()),
        })
    }

    /// Parses the header and IFD chain of an already-open file
    fn from_file(mut file: File, writable: bool, options: TiffOptions) -> TiffResult<Self> {
        let file_len = file.seek(SeekFrom::End(0))?;
        file.seek(SeekFrom::Start(0))?;
        let min_header = header::CLASSIC_HEADER_SIZE;
        if file_len < min_header {
            return Err(TiffError::TruncatedFile(format!(
                "file is {} bytes, smaller than a TIFF header",
                file_len
            )));
        }

        let byte_order = ByteOrder::detect(&mut file)?;
        debug!("Detected byte order: {}", byte_order.name());
        let handler = byte_order.create_handler();

        let version = handler.read_u16(&mut file)?;
        let big_tiff = match version {
            header::BIG_TIFF_VERSION => {
                let offset_size = handler.read_u16(&mut file)?;
                let zeros = handler.read_u16(&mut file)?;
                if offset_size != header::BIGTIFF_OFFSET_SIZE || zeros != 0 {
                    return Err(TiffError::InvalidBigTIFFHeader);
                }
                true
            }
            header::TIFF_VERSION => false,
            _ => return Err(TiffError::UnsupportedVersion(version)),
        };
        if big_tiff && file_len < header::BIGTIFF_HEADER_SIZE {
            return Err(TiffError::TruncatedFile(
                "file too small for a BigTIFF header".to_string(),
            ));
        }

        let first_ifd_offset = if big_tiff {
            handler.read_u64(&mut file)?
        } else {
            handler.read_u32(&mut file)? as u64
        };
        debug!("First IFD offset: {}", first_ifd_offset);

        let cache = Arc::new(TileCache::new(options.max_caching_memory));
        let mut engine = TiffEngine {
            file: Mutex::new(file),
            handler,
            byte_order,
            big_tiff,
            writable,
            options,
            registry: Arc::new(CodecRegistry::with_builtins()),
            cache,
            ifds: Vec::new(),
            fingerprints: Vec::new(),
            next_link_pos: Mutex::new(if big_tiff { 8 } else { 4 }),
            written_ifds: Mutex::new(Vec::new()),
        };

        let ifds = engine.read_ifd_chain(first_ifd_offset, file_len)?;
        info!("Read {} IFDs from TIFF file", ifds.len());
        engine.fingerprints = ifds.iter().map(|_| next_fingerprint()).collect();
        engine.ifds = ifds.into_iter().map(Arc::new).collect();
        Ok(engine)
    }

    /// Walks the IFD chain from the first offset
    ///
    /// Offsets beyond the file length and revisited offsets stop the
    /// walk; in strict mode they are errors, otherwise the chain is
    /// truncated at the last good IFD with a warning.
    fn read_ifd_chain(&self, first_offset: u64, file_len: u64) -> TiffResult<Vec<Ifd>> {
        let mut ifds = Vec::new();
        let mut offset = first_offset;
        let mut visited: HashSet<u64> = HashSet::new();
        let mut file = self.file.lock().unwrap();

        while offset != 0 {
            if offset >= file_len {
                let message = format!(
                    "IFD offset {} beyond file length {}",
                    offset, file_len
                );
                if self.options.require_valid_tiff {
                    return Err(TiffError::TruncatedFile(message));
                }
                warn!("{}, stopping IFD chain", message);
                break;
            }
            if !visited.insert(offset) {
                let message = format!("IFD chain revisits offset {}", offset);
                if self.options.require_valid_tiff {
                    return Err(TiffError::MalformedIfd(message));
                }
                warn!("{}, stopping IFD chain", message);
                break;
            }

            let number = ifds.len();
            debug!("Reading IFD #{} at offset {}", number, offset);
            let (ifd, next_offset) = self.read_ifd(&mut file, offset, number, file_len)?;
            ifds.push(ifd);
            offset = next_offset;
        }

        Ok(ifds)
    }

    /// Reads one IFD and the offset of its successor
    fn read_ifd(
        &self,
        file: &mut File,
        offset: u64,
        number: usize,
        file_len: u64,
    ) -> TiffResult<(Ifd, u64)> {
        file.seek(SeekFrom::Start(offset))?;

        let entry_count = if self.big_tiff {
            self.handler.read_u64(file)?
        } else {
            self.handler.read_u16(file)? as u64
        };
        debug!("IFD entry count: {}", entry_count);

        let entry_size = if self.big_tiff { 20 } else { 12 };
        let table_end = offset
            + if self.big_tiff { 8 } else { 2 }
            + entry_count * entry_size
            + if self.big_tiff { 8 } else { 4 };
        if table_end > file_len {
            return Err(TiffError::TruncatedFile(format!(
                "IFD #{} entry table runs past end of file",
                number
            )));
        }

        let inline_size = if self.big_tiff { 8usize } else { 4 };
        let mut raw_entries = Vec::with_capacity(entry_count as usize);
        for _ in 0..entry_count {
            let tag = self.handler.read_u16(file)?;
            let field_type = self.handler.read_u16(file)?;
            let count = if self.big_tiff {
                self.handler.read_u64(file)?
            } else {
                self.handler.read_u32(file)? as u64
            };
            let mut value_field = vec![0u8; inline_size];
            file.read_exact(&mut value_field)?;
            raw_entries.push((tag, field_type, count, value_field));
        }

        let next_offset = if self.big_tiff {
            self.handler.read_u64(file)?
        } else {
            self.handler.read_u32(file)? as u64
        };

        // Payloads after the table so the file cursor only moves forward
        // through the entry list once
        let mut ifd = Ifd::new(number, offset);
        for (tag, field_type, count, value_field) in raw_entries {
            match self.read_value(file, field_type, count, &value_field, file_len)? {
                Some(value) => ifd.put(tag, value),
                None => {
                    let message =
                        format!("IFD #{} tag {} has unknown field type {}", number, tag, field_type);
                    if self.options.require_valid_tiff {
                        return Err(TiffError::MalformedIfd(message));
                    }
                    warn!("{}, skipping entry", message);
                }
            }
        }

        Ok((ifd, next_offset))
    }

    /// Materialises one entry's typed value
    ///
    /// Small payloads live in the entry's value field; larger ones sit
    /// at an absolute offset. Returns None for field types this engine
    /// does not know.
    fn read_value(
        &self,
        file: &mut File,
        field_type: u16,
        count: u64,
        value_field: &[u8],
        file_len: u64,
    ) -> TiffResult<Option<Value>> {
        let element = field_type_size(field_type);
        if !known_field_type(field_type) {
            return Ok(None);
        }

        let total = element * count;
        let inline = total as usize <= value_field.len();

        let payload = if inline {
            value_field.to_vec()
        } else {
            let mut cursor = Cursor::new(value_field.to_vec());
            let data_offset = if self.big_tiff {
                self.handler.read_u64(&mut cursor)?
            } else {
                self.handler.read_u32(&mut cursor)? as u64
            };
            if data_offset + total > file_len {
                return Err(TiffError::TruncatedFile(format!(
                    "tag payload at offset {} ({} bytes) beyond file length {}",
                    data_offset, total, file_len
                )));
            }
            let restore = file.stream_position()?;
            file.seek(SeekFrom::Start(data_offset))?;
            let mut buffer = vec![0u8; total as usize];
            file.read_exact(&mut buffer)?;
            file.seek(SeekFrom::Start(restore))?;
            buffer
        };

        let mut cursor = Cursor::new(payload);
        let handler = &self.handler;
        let n = count as usize;

        let value = match field_type {
            field_types::BYTE => {
                let mut v = vec![0u8; n];
                cursor.read_exact(&mut v)?;
                Value::Byte(v)
            }
            field_types::ASCII => {
                let mut v = vec![0u8; n];
                cursor.read_exact(&mut v)?;
                while v.last() == Some(&0) {
                    v.pop();
                }
                let text = String::from_utf8_lossy(&v).into_owned();
                Value::Ascii(text)
            }
            field_types::UNDEFINED => {
                let mut v = vec![0u8; n];
                cursor.read_exact(&mut v)?;
                Value::Undefined(v)
            }
            field_types::SBYTE => {
                let mut v = vec![0u8; n];
                cursor.read_exact(&mut v)?;
                Value::SByte(v.into_iter().map(|b| b as i8).collect())
            }
            field_types::SHORT => {
                let mut v = Vec::with_capacity(n);
                for _ in 0..n {
                    v.push(handler.read_u16(&mut cursor)?);
                }
                Value::Short(v)
            }
            field_types::SSHORT => {
                let mut v = Vec::with_capacity(n);
                for _ in 0..n {
                    v.push(handler.read_u16(&mut cursor)? as i16);
                }
                Value::SShort(v)
            }
            field_types::LONG => {
                let mut v = Vec::with_capacity(n);
                for _ in 0..n {
                    v.push(handler.read_u32(&mut cursor)?);
                }
                Value::Long(v)
            }
            field_types::SLONG => {
                let mut v = Vec::with_capacity(n);
                for _ in 0..n {
                    v.push(handler.read_u32(&mut cursor)? as i32);
                }
                Value::SLong(v)
            }
            field_types::RATIONAL => {
                let mut v = Vec::with_capacity(n);
                for _ in 0..n {
                    v.push(handler.read_rational(&mut cursor)?);
                }
                Value::Rational(v)
            }
            field_types::SRATIONAL => {
                let mut v = Vec::with_capacity(n);
                for _ in 0..n {
                    v.push(handler.read_srational(&mut cursor)?);
                }
                Value::SRational(v)
            }
            field_types::FLOAT => {
                let mut v = Vec::with_capacity(n);
                for _ in 0..n {
                    v.push(handler.read_f32(&mut cursor)?);
                }
                Value::Float(v)
            }
            field_types::DOUBLE => {
                let mut v = Vec::with_capacity(n);
                for _ in 0..n {
                    v.push(handler.read_f64(&mut cursor)?);
                }
                Value::Double(v)
            }
            field_types::LONG8 | field_types::IFD8 => {
                let mut v = Vec::with_capacity(n);
                for _ in 0..n {
                    v.push(handler.read_u64(&mut cursor)?);
                }
                if field_type == field_types::IFD8 {
                    Value::Ifd8(v)
                } else {
                    Value::Long8(v)
                }
            }
            field_types::SLONG8 => {
                let mut v = Vec::with_capacity(n);
                for _ in 0..n {
                    v.push(handler.read_u64(&mut cursor)? as i64);
                }
                Value::SLong8(v)
            }
            _ => return Ok(None),
        };

        Ok(Some(value))
    }

    // Accessors

    /// Number of images in the file
    pub fn number_of_images(&self) -> usize {
        self.ifds.len()
    }

    /// All IFDs in chain order
    pub fn ifds(&self) -> &[Arc<Ifd>] {
        &self.ifds
    }

    /// One image's IFD
    pub fn ifd(&self, image: usize) -> TiffResult<Arc<Ifd>> {
        self.ifds.get(image).cloned().ok_or_else(|| {
            TiffError::GenericError(format!(
                "image index {} out of range ({} images)",
                image,
                self.ifds.len()
            ))
        })
    }

    /// Cache fingerprint of one image
    pub(crate) fn fingerprint(&self, image: usize) -> u64 {
        self.fingerprints.get(image).copied().unwrap_or(0)
    }

    /// Heuristic role of one image within the document
    pub fn image_kind(&self, image: usize) -> TiffResult<ImageKind> {
        let ifd = self.ifd(image)?;
        Ok(kind::classify(image, &ifd))
    }

    pub fn is_big_tiff(&self) -> bool {
        self.big_tiff
    }

    pub fn byte_order(&self) -> ByteOrder {
        self.byte_order
    }

    pub fn options(&self) -> &TiffOptions {
        &self.options
    }

    pub fn cache(&self) -> &Arc<TileCache> {
        &self.cache
    }

    pub fn registry(&self) -> &Arc<CodecRegistry> {
        &self.registry
    }

    /// Replaces the codec registry, e.g. to add external codecs
    pub fn set_registry(&mut self, registry: Arc<CodecRegistry>) {
        self.registry = registry;
    }

    /// IFDs committed to this file through write maps
    pub fn written_ifds(&self) -> Vec<Arc<Ifd>> {
        self.written_ifds.lock().unwrap().clone()
    }

    /// Opens a read map over one image
    pub fn read_map(&self, image: usize) -> TiffResult<ReadMap<'_>> {
        ReadMap::new(self, image)
    }

    /// Opens a write map staging one outgoing image
    pub fn write_map(&self, ifd: Ifd) -> TiffResult<WriteMap<'_>> {
        if !self.writable {
            return Err(TiffError::GenericError(
                "engine was opened read-only".to_string(),
            ));
        }
        WriteMap::new(self, ifd)
    }

    // Tile byte transfer

    /// Reads the encoded bytes of one data block
    ///
    /// Returns None for a zero-length entry; the caller materialises a
    /// blank tile. Offsets past the end of the file are refused.
    pub(crate) fn read_block_bytes(
        &self,
        offset: u64,
        byte_count: u64,
    ) -> TiffResult<Option<Vec<u8>>> {
        if byte_count == 0 {
            return Ok(None);
        }
        let mut file = self.file.lock().unwrap();
        let file_len = file.seek(SeekFrom::End(0))?;
        if offset + byte_count > file_len {
            return Err(TiffError::TruncatedFile(format!(
                "tile bytes at offset {} ({} bytes) beyond file length {}",
                offset, byte_count, file_len
            )));
        }
        file.seek(SeekFrom::Start(offset))?;
        let mut buffer = vec![0u8; byte_count as usize];
        file.read_exact(&mut buffer)?;
        Ok(Some(buffer))
    }

    /// Current file length
    pub(crate) fn file_len(&self) -> TiffResult<u64> {
        let mut file = self.file.lock().unwrap();
        Ok(file.seek(SeekFrom::End(0))?)
    }

    /// Appends bytes at the end of the file, word-aligned
    ///
    /// Returns the offset the data starts at.
    pub(crate) fn append_bytes(&self, data: &[u8]) -> TiffResult<u64> {
        let mut file = self.file.lock().unwrap();
        let mut end = file.seek(SeekFrom::End(0))?;
        let padding = (4 - (end % 4) as usize) % 4;
        if padding > 0 {
            file.write_all(&[0u8; 3][..padding])?;
            end += padding as u64;
        }
        file.write_all(data)?;
        Ok(end)
    }

    /// Reserves a zero-filled region at the end of the file
    pub(crate) fn reserve_bytes(&self, size: u64) -> TiffResult<u64> {
        let mut file = self.file.lock().unwrap();
        let mut end = file.seek(SeekFrom::End(0))?;
        let padding = (4 - (end % 4) as usize) % 4;
        if padding > 0 {
            file.write_all(&[0u8; 3][..padding])?;
            end += padding as u64;
        }
        file.write_all(&vec![0u8; size as usize])?;
        Ok(end)
    }

    /// Overwrites bytes at an absolute offset
    pub(crate) fn patch_bytes(&self, offset: u64, data: &[u8]) -> TiffResult<()> {
        let mut file = self.file.lock().unwrap();
        file.seek(SeekFrom::Start(offset))?;
        file.write_all(data)?;
        file.flush()?;
        Ok(())
    }

    /// Truncates the file, rolling back a partially-written image
    pub(crate) fn truncate_to(&self, len: u64) -> TiffResult<()> {
        let file = self.file.lock().unwrap();
        file.set_len(len)?;
        Ok(())
    }

    /// Links a completed IFD into the chain
    ///
    /// Patches the pointer recorded by the previous commit (initially
    /// the header's first-IFD field) and remembers where this IFD's
    /// own next-pointer lives.
    pub(crate) fn link_ifd(
        &self,
        ifd: Ifd,
        ifd_offset: u64,
        own_link_pos: u64,
    ) -> TiffResult<()> {
        let mut link_pos = self.next_link_pos.lock().unwrap();
        let mut buffer = Vec::new();
        {
            let mut cursor = Cursor::new(&mut buffer);
            if self.big_tiff {
                self.handler.write_u64(&mut cursor, ifd_offset)?;
            } else {
                self.handler.write_u32(&mut cursor, ifd_offset as u32)?;
            }
        }
        self.patch_bytes(*link_pos, &buffer)?;
        *link_pos = own_link_pos;

        let mut written = self.written_ifds.lock().unwrap();
        let mut ifd = ifd;
        ifd.set_number(written.len());
        ifd.set_offset(ifd_offset);
        written.push(Arc::new(ifd));
        Ok(())
    }

    /// Serializes an IFD into a buffer laid out for `base_offset`
    ///
    /// Layout: count field, entry table in ascending tag order, the
    /// next-IFD pointer (zero), then the external payloads of values
    /// too large for their entry's inline field. Returns the buffer and
    /// the position of the next-IFD pointer relative to the base.
    pub(crate) fn serialize_ifd(&self, ifd: &Ifd, base_offset: u64) -> TiffResult<(Vec<u8>, u64)> {
        let (count_size, entry_size, link_size, inline) = if self.big_tiff {
            (8u64, 20u64, 8u64, 8usize)
        } else {
            (2, 12, 4, 4)
        };
        let entry_count = ifd.entry_count() as u64;
        let structure = count_size + entry_size * entry_count + link_size;
        let link_pos = structure - link_size;

        let mut buffer = Vec::with_capacity(structure as usize);
        let mut cursor = Cursor::new(&mut buffer);
        if self.big_tiff {
            self.handler.write_u64(&mut cursor, entry_count)?;
        } else {
            self.handler.write_u16(&mut cursor, entry_count as u16)?;
        }

        // External payloads land directly after the IFD structure
        let mut externals: Vec<u8> = Vec::new();

        for (tag, value) in ifd.entries() {
            self.handler.write_u16(&mut cursor, *tag)?;
            self.handler.write_u16(&mut cursor, value.field_type())?;
            if self.big_tiff {
                self.handler.write_u64(&mut cursor, value.count())?;
            } else {
                self.handler.write_u32(&mut cursor, value.count() as u32)?;
            }

            let payload = self.serialize_value(value)?;
            if payload.len() <= inline {
                let mut field = payload;
                field.resize(inline, 0);
                cursor.write_all(&field)?;
            } else {
                let data_offset = base_offset + structure + externals.len() as u64;
                if self.big_tiff {
                    self.handler.write_u64(&mut cursor, data_offset)?;
                } else {
                    self.handler.write_u32(&mut cursor, data_offset as u32)?;
                }
                externals.extend_from_slice(&payload);
                // Word-align the next payload
                while externals.len() % 2 != 0 {
                    externals.push(0);
                }
            }
        }

        // Next-IFD pointer, patched when the successor is committed
        if self.big_tiff {
            self.handler.write_u64(&mut cursor, 0)?;
        } else {
            self.handler.write_u32(&mut cursor, 0)?;
        }
        drop(cursor);

        buffer.extend_from_slice(&externals);
        Ok((buffer, link_pos))
    }

    /// Serializes one value's payload in the file's byte order
    fn serialize_value(&self, value: &Value) -> TiffResult<Vec<u8>> {
        let mut out = Vec::new();
        let mut cursor = Cursor::new(&mut out);
        match value {
            Value::Byte(v) | Value::Undefined(v) => cursor.write_all(v)?,
            Value::Ascii(s) => {
                cursor.write_all(s.as_bytes())?;
                cursor.write_all(&[0])?;
            }
            Value::SByte(v) => {
                for &x in v {
                    cursor.write_all(&[x as u8])?;
                }
            }
            Value::Short(v) => {
                for &x in v {
                    self.handler.write_u16(&mut cursor, x)?;
                }
            }
            Value::SShort(v) => {
                for &x in v {
                    self.handler.write_u16(&mut cursor, x as u16)?;
                }
            }
            Value::Long(v) => {
                for &x in v {
                    self.handler.write_u32(&mut cursor, x)?;
                }
            }
            Value::SLong(v) => {
                for &x in v {
                    self.handler.write_u32(&mut cursor, x as u32)?;
                }
            }
            Value::Rational(v) => {
                for &(num, den) in v {
                    self.handler.write_u32(&mut cursor, num)?;
                    self.handler.write_u32(&mut cursor, den)?;
                }
            }
            Value::SRational(v) => {
                for &(num, den) in v {
                    self.handler.write_u32(&mut cursor, num as u32)?;
                    self.handler.write_u32(&mut cursor, den as u32)?;
                }
            }
            Value::Float(v) => {
                for &x in v {
                    self.handler.write_f32(&mut cursor, x)?;
                }
            }
            Value::Double(v) => {
                for &x in v {
                    self.handler.write_f64(&mut cursor, x)?;
                }
            }
            Value::Long8(v) | Value::Ifd8(v) => {
                for &x in v {
                    self.handler.write_u64(&mut cursor, x)?;
                }
            }
            Value::SLong8(v) => {
                for &x in v {
                    self.handler.write_u64(&mut cursor, x as u64)?;
                }
            }
        }
        drop(cursor);
        Ok(out)
    }
}

fn known_field_type(field_type: u16) -> bool {
    matches!(
        field_type,
        field_types::BYTE
            | field_types::ASCII
            | field_types::SHORT
            | field_types::LONG
            | field_types::RATIONAL
            | field_types::SBYTE
            | field_types::UNDEFINED
            | field_types::SSHORT
            | field_types::SLONG
            | field_types::SRATIONAL
            | field_types::FLOAT
            | field_types::DOUBLE
            | field_types::LONG8
            | field_types::SLONG8
            | field_types::IFD8
    )
}
