//! Builders for synthetic IDA database files.
//!
//! Layouts follow the version-6 container format: an 88-byte file header,
//! framed sections in slot order, small ID0 pages to keep fixtures compact,
//! and 0x2000-byte ID1/NAM pages.

#![allow(dead_code)]

use byteorder::{ByteOrder, LittleEndian};

/// ID0 page size used by the fixtures.
pub const PAGE_SIZE: usize = 0x200;
/// ID1/NAM page size (fixed by the format).
pub const VA_PAGE: usize = 0x2000;

pub fn common_prefix_len(a: &[u8], b: &[u8]) -> usize {
    a.iter().zip(b.iter()).take_while(|(x, y)| x == y).count()
}

/// Build one leaf page with front-compressed keys.
pub fn build_leaf_page(entries: &[(&[u8], &[u8])]) -> Vec<u8> {
    let mut page = vec![0u8; PAGE_SIZE];
    LittleEndian::write_u16(&mut page[4..], entries.len() as u16);
    let mut payload_pos = 6 + entries.len() * 6;
    let mut prev: &[u8] = &[];
    for (i, (key, value)) in entries.iter().enumerate() {
        let shared = common_prefix_len(prev, key);
        let stored = &key[shared..];
        let ptr = 6 + i * 6;
        LittleEndian::write_u16(&mut page[ptr..], shared as u16);
        LittleEndian::write_u16(&mut page[ptr + 4..], payload_pos as u16);
        LittleEndian::write_u16(&mut page[payload_pos..], stored.len() as u16);
        page[payload_pos + 2..payload_pos + 2 + stored.len()].copy_from_slice(stored);
        let voff = payload_pos + 2 + stored.len();
        LittleEndian::write_u16(&mut page[voff..], value.len() as u16);
        page[voff + 2..voff + 2 + value.len()].copy_from_slice(value);
        payload_pos = voff + 2 + value.len();
        prev = key;
    }
    page
}

/// Build one branch page. Each entry is `(key, value, child_page)`;
/// `ppointer` is the leftmost child.
pub fn build_branch_page(ppointer: u32, entries: &[(&[u8], &[u8], u32)]) -> Vec<u8> {
    let mut page = vec![0u8; PAGE_SIZE];
    LittleEndian::write_u32(&mut page[0..], ppointer);
    LittleEndian::write_u16(&mut page[4..], entries.len() as u16);
    let mut payload_pos = 6 + entries.len() * 6;
    for (i, (key, value, child)) in entries.iter().enumerate() {
        let ptr = 6 + i * 6;
        LittleEndian::write_u32(&mut page[ptr..], *child);
        LittleEndian::write_u16(&mut page[ptr + 4..], payload_pos as u16);
        LittleEndian::write_u16(&mut page[payload_pos..], key.len() as u16);
        page[payload_pos + 2..payload_pos + 2 + key.len()].copy_from_slice(key);
        let voff = payload_pos + 2 + key.len();
        LittleEndian::write_u16(&mut page[voff..], value.len() as u16);
        page[voff + 2..voff + 2 + value.len()].copy_from_slice(value);
        payload_pos = voff + 2 + value.len();
    }
    page
}

/// Build an ID0 section payload: the header occupies the page-0 slot, then
/// the given pages follow as pages 1, 2, ...
pub fn build_id0_section(pages: &[Vec<u8>], root_page: u32, record_count: u32) -> Vec<u8> {
    let mut buf = vec![0u8; PAGE_SIZE];
    LittleEndian::write_u16(&mut buf[4..], PAGE_SIZE as u16);
    LittleEndian::write_u32(&mut buf[6..], root_page);
    LittleEndian::write_u32(&mut buf[10..], record_count);
    LittleEndian::write_u32(&mut buf[14..], pages.len() as u32 + 1);
    buf[19..28].copy_from_slice(b"B-tree v2");
    for page in pages {
        assert_eq!(page.len(), PAGE_SIZE);
        buf.extend_from_slice(page);
    }
    buf
}

/// Build an ID1 section payload. Flag words fill the buffer front to back,
/// matching the contiguous packing of the given segments.
pub fn build_id1_section(wordsize: usize, segments: &[(u64, u64)], flags: &[u32]) -> Vec<u8> {
    let mut buf = Vec::new();
    buf.extend_from_slice(b"VA*\x00");
    push_u32(&mut buf, 0x3);
    push_u32(&mut buf, segments.len() as u32);
    push_u32(&mut buf, 0x800);
    let total_words: u64 = segments.iter().map(|(s, e)| e - s).sum();
    let page_count = (total_words * 4).div_ceil(VA_PAGE as u64) as u32;
    push_u32(&mut buf, page_count);
    for &(start, end) in segments {
        push_word(&mut buf, start, wordsize);
        push_word(&mut buf, end, wordsize);
    }
    buf.resize(VA_PAGE, 0);
    for &word in flags {
        push_u32(&mut buf, word);
    }
    buf.resize(VA_PAGE + page_count as usize * VA_PAGE, 0);
    buf
}

/// Build a NAM section payload holding the given addresses.
pub fn build_nam_section(wordsize: usize, addresses: &[u64]) -> Vec<u8> {
    let mut buf = Vec::new();
    buf.extend_from_slice(b"VA*\x00");
    push_u32(&mut buf, 0x3);
    push_u32(&mut buf, u32::from(!addresses.is_empty()));
    push_u32(&mut buf, 0x800);
    let page_count = (addresses.len() * wordsize).div_ceil(VA_PAGE).max(1) as u32;
    push_u32(&mut buf, page_count);
    buf.extend_from_slice(&vec![0u8; wordsize]); // reserved word
    push_u32(&mut buf, addresses.len() as u32);
    buf.resize(VA_PAGE, 0);
    for &ea in addresses {
        push_word(&mut buf, ea, wordsize);
    }
    buf.resize(VA_PAGE + page_count as usize * VA_PAGE, 0);
    buf
}

/// Build a TIL section payload.
pub fn build_til_section(body: &[u8]) -> Vec<u8> {
    let mut buf = b"IDATIL".to_vec();
    buf.extend_from_slice(body);
    buf
}

/// Frame a section payload: compression flag, u64 length, payload.
pub fn frame_section(is_compressed: u8, payload: &[u8]) -> Vec<u8> {
    let mut buf = vec![is_compressed];
    let mut len = [0u8; 8];
    LittleEndian::write_u64(&mut len, payload.len() as u64);
    buf.extend_from_slice(&len);
    buf.extend_from_slice(payload);
    buf
}

/// Build the 88-byte file header with the given section offsets.
pub fn build_file_header(signature: &[u8; 4], offsets: [u64; 6]) -> Vec<u8> {
    let mut buf = vec![0u8; 88];
    buf[0..4].copy_from_slice(signature);
    LittleEndian::write_u64(&mut buf[6..], offsets[0]);
    LittleEndian::write_u64(&mut buf[14..], offsets[1]);
    LittleEndian::write_u32(&mut buf[26..], 0xAABBCCDD);
    LittleEndian::write_u16(&mut buf[30..], 6);
    LittleEndian::write_u64(&mut buf[32..], offsets[2]);
    LittleEndian::write_u64(&mut buf[40..], offsets[3]);
    LittleEndian::write_u64(&mut buf[48..], offsets[4]);
    LittleEndian::write_u64(&mut buf[76..], offsets[5]);
    buf
}

/// Assemble a whole database file: header plus framed sections in slot
/// order (`id0`, `id1`, `nam`, `seg`, `til`, `id2`); `None` leaves the slot
/// absent.
pub fn assemble(signature: &[u8; 4], payloads: [Option<&[u8]>; 6]) -> Vec<u8> {
    let mut offsets = [0u64; 6];
    let mut body = Vec::new();
    let mut pos = 88u64;
    for (slot, payload) in payloads.iter().enumerate() {
        if let Some(payload) = payload {
            let framed = frame_section(0, payload);
            offsets[slot] = pos;
            pos += framed.len() as u64;
            body.extend_from_slice(&framed);
        }
    }
    let mut file = build_file_header(signature, offsets);
    file.extend_from_slice(&body);
    file
}

fn push_u32(buf: &mut Vec<u8>, value: u32) {
    let mut tmp = [0u8; 4];
    LittleEndian::write_u32(&mut tmp, value);
    buf.extend_from_slice(&tmp);
}

fn push_word(buf: &mut Vec<u8>, value: u64, wordsize: usize) {
    if wordsize == 8 {
        let mut tmp = [0u8; 8];
        LittleEndian::write_u64(&mut tmp, value);
        buf.extend_from_slice(&tmp);
    } else {
        push_u32(buf, value as u32);
    }
}

/// Two-level B-tree fixture.
///
/// Root branch (page 1) carries two entries whose child subtrees are the
/// middle and right leaves; `ppointer` is the left leaf:
///
/// ```text
///   page 1 (branch): ". fixups" -> page 3, "Nmain" -> page 4, ppointer = 2
///   page 2 (leaf):   "$ MAX LINK", "$ MAX NODE", "$ NET DESC"
///   page 3 (leaf):   ".A0001", ".B0002"
///   page 4 (leaf):   "Nwcsrchr", "Nwcsstr"
/// ```
///
/// Key order: page 2 < ". fixups" < page 3 < "Nmain" < page 4.
pub fn two_level_id0() -> Vec<u8> {
    let left = build_leaf_page(&[
        (b"$ MAX LINK", b"\x13"),
        (b"$ MAX NODE", b"\x02"),
        (b"$ NET DESC", b"\x24"),
    ]);
    let middle = build_leaf_page(&[(b".A0001", b"\x01\x08"), (b".B0002", b"\x02")]);
    let right = build_leaf_page(&[(b"Nwcsrchr", b"\x0a"), (b"Nwcsstr", b"\x0b")]);
    let root = build_branch_page(2, &[(b". fixups", b"\xf1", 3), (b"Nmain", b"\xf2", 4)]);
    build_id0_section(&[root, left, middle, right], 1, 9)
}

/// All keys of [`two_level_id0`], ascending.
pub fn two_level_keys() -> Vec<&'static [u8]> {
    vec![
        b"$ MAX LINK",
        b"$ MAX NODE",
        b"$ NET DESC",
        b". fixups",
        b".A0001",
        b".B0002",
        b"Nmain",
        b"Nwcsrchr",
        b"Nwcsstr",
    ]
}

/// Three-level B-tree fixture, two keys per leaf:
///
/// ```text
///   page 1 (branch): "dd" -> page 3, ppointer = 2
///   page 2 (branch): "bb" -> page 5, ppointer = 4
///   page 3 (branch): "ff" -> page 7, ppointer = 6
///   page 4 (leaf):   "aa1", "aa2"
///   page 5 (leaf):   "cc1", "cc2"
///   page 6 (leaf):   "ee1", "ee2"
///   page 7 (leaf):   "gg1", "gg2"
/// ```
pub fn three_level_id0() -> Vec<u8> {
    let root = build_branch_page(2, &[(b"dd", b"\xd0", 3)]);
    let left_mid = build_branch_page(4, &[(b"bb", b"\xb0", 5)]);
    let right_mid = build_branch_page(6, &[(b"ff", b"\xf0", 7)]);
    let leaf_a = build_leaf_page(&[(b"aa1", b"\x01"), (b"aa2", b"\x02")]);
    let leaf_c = build_leaf_page(&[(b"cc1", b"\x03"), (b"cc2", b"\x04")]);
    let leaf_e = build_leaf_page(&[(b"ee1", b"\x05"), (b"ee2", b"\x06")]);
    let leaf_g = build_leaf_page(&[(b"gg1", b"\x07"), (b"gg2", b"\x08")]);
    build_id0_section(
        &[root, left_mid, right_mid, leaf_a, leaf_c, leaf_e, leaf_g],
        1,
        11,
    )
}

/// All keys of [`three_level_id0`], ascending.
pub fn three_level_keys() -> Vec<&'static [u8]> {
    vec![
        b"aa1", b"aa2", b"bb", b"cc1", b"cc2", b"dd", b"ee1", b"ee2", b"ff", b"gg1", b"gg2",
    ]
}
