//! Tests for the byte order module

use std::io::Cursor;
use byteorder::{BigEndian, LittleEndian, WriteBytesExt};
use crate::io::byte_order::{BigEndianHandler, ByteOrder, ByteOrderHandler, LittleEndianHandler};

#[test]
fn test_byte_order_detection_little_endian() {
    let mut buffer = Vec::new();
    buffer.write_u16::<LittleEndian>(0x4949).unwrap(); // II
    let mut cursor = Cursor::new(buffer);

    let result = ByteOrder::detect(&mut cursor);
    assert!(result.is_ok());
    assert_eq!(result.unwrap(), ByteOrder::LittleEndian);
}

#[test]
fn test_byte_order_detection_big_endian() {
    let mut buffer = Vec::new();
    buffer.write_u16::<BigEndian>(0x4D4D).unwrap(); // MM
    let mut cursor = Cursor::new(buffer);

    let result = ByteOrder::detect(&mut cursor);
    assert!(result.is_ok());
    assert_eq!(result.unwrap(), ByteOrder::BigEndian);
}

#[test]
fn test_byte_order_detection_invalid() {
    let mut buffer = Vec::new();
    buffer.write_u16::<LittleEndian>(0x1234).unwrap(); // Invalid
    let mut cursor = Cursor::new(buffer);

    let result = ByteOrder::detect(&mut cursor);
    assert!(result.is_err());
}

#[test]
fn test_little_endian_handler_reads() {
    let mut buffer = Vec::new();
    buffer.write_u16::<LittleEndian>(0x1234).unwrap();
    buffer.write_u32::<LittleEndian>(0x12345678).unwrap();
    buffer.write_u64::<LittleEndian>(0x1234567890ABCDEF).unwrap();
    let mut cursor = Cursor::new(buffer);

    let handler = LittleEndianHandler;
    assert_eq!(handler.read_u16(&mut cursor).unwrap(), 0x1234);
    assert_eq!(handler.read_u32(&mut cursor).unwrap(), 0x12345678);
    assert_eq!(handler.read_u64(&mut cursor).unwrap(), 0x1234567890ABCDEF);
}

#[test]
fn test_big_endian_handler_reads() {
    let mut buffer = Vec::new();
    buffer.write_u16::<BigEndian>(0x1234).unwrap();
    buffer.write_u32::<BigEndian>(0x12345678).unwrap();
    let mut cursor = Cursor::new(buffer);

    let handler = BigEndianHandler;
    assert_eq!(handler.read_u16(&mut cursor).unwrap(), 0x1234);
    assert_eq!(handler.read_u32(&mut cursor).unwrap(), 0x12345678);
}

#[test]
fn test_write_then_read_round_trip() {
    for order in [ByteOrder::LittleEndian, ByteOrder::BigEndian] {
        let handler = order.create_handler();

        let mut cursor = Cursor::new(Vec::new());
        handler.write_u16(&mut cursor, 0xBEEF).unwrap();
        handler.write_u32(&mut cursor, 0xDEADBEEF).unwrap();
        handler.write_u64(&mut cursor, 0x0123456789ABCDEF).unwrap();
        handler.write_f64(&mut cursor, 2.5).unwrap();

        cursor.set_position(0);
        assert_eq!(handler.read_u16(&mut cursor).unwrap(), 0xBEEF);
        assert_eq!(handler.read_u32(&mut cursor).unwrap(), 0xDEADBEEF);
        assert_eq!(handler.read_u64(&mut cursor).unwrap(), 0x0123456789ABCDEF);
        assert_eq!(handler.read_f64(&mut cursor).unwrap(), 2.5);
    }
}

#[test]
fn test_rational_reads() {
    let mut buffer = Vec::new();
    buffer.write_u32::<BigEndian>(300).unwrap();
    buffer.write_u32::<BigEndian>(1).unwrap();
    let mut cursor = Cursor::new(buffer);

    let handler = BigEndianHandler;
    assert_eq!(handler.read_rational(&mut cursor).unwrap(), (300, 1));
}

#[test]
fn test_marker_matches_detection() {
    for order in [ByteOrder::LittleEndian, ByteOrder::BigEndian] {
        let mut cursor = Cursor::new(order.marker().to_vec());
        assert_eq!(ByteOrder::detect(&mut cursor).unwrap(), order);
    }
}
