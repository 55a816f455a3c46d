use std::io::{Read, Seek, SeekFrom};

use byteorder::{BigEndian, ByteOrder, LittleEndian, ReadBytesExt};
use log::debug;

use crate::commands::LoadCommand;
use crate::consts::*;
use crate::errors::*;
use crate::symbol::resolve_symtab;

/// The 64-bit Mach-O file header, eight 32-bit words at offset 0.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ObjectHeader {
    pub magic: u32,
    pub cputype: cpu_type_t,
    pub cpusubtype: cpu_subtype_t,
    pub filetype: u32,
    pub ncmds: u32,
    pub sizeofcmds: u32,
    pub flags: u32,
    pub reserved: u32,
}

pub const OBJECT_HEADER_SIZE: u64 = 32;

impl ObjectHeader {
    fn parse<O: ByteOrder, R: Read>(buf: &mut R) -> Result<ObjectHeader> {
        Ok(ObjectHeader {
            magic: buf.read_u32::<O>()?,
            cputype: buf.read_i32::<O>()?,
            cpusubtype: buf.read_i32::<O>()?,
            filetype: buf.read_u32::<O>()?,
            ncmds: buf.read_u32::<O>()?,
            sizeofcmds: buf.read_u32::<O>()?,
            flags: buf.read_u32::<O>()?,
            reserved: buf.read_u32::<O>()?,
        })
    }
}

/// A decoded load command together with its raw cmdsize field.
#[derive(Debug, Clone)]
pub struct MachCommand(pub LoadCommand, pub u32);

/// A fully decoded object file: the header plus its load commands in
/// source order. Built once by `parse`, immutable afterwards.
#[derive(Debug, Clone)]
pub struct ObjectFile {
    pub header: ObjectHeader,
    pub commands: Vec<MachCommand>,
}

impl ObjectFile {
    /// Decode a 64-bit Mach-O object from a seekable byte source
    /// positioned anywhere (the stream is read from offset 0).
    ///
    /// Runs both passes: the sequential load-command decode, then the
    /// symbol-table resolution against the out-of-line string and symbol
    /// tables. The cursor position on return is unspecified. Ownership
    /// of the stream stays with the caller.
    ///
    /// The magic selects the byte order of every subsequent field;
    /// anything other than MH_MAGIC_64/MH_CIGAM_64 (including 32-bit and
    /// fat magics) fails with `MalformedHeader`.
    pub fn parse<R: Read + Seek>(buf: &mut R) -> Result<ObjectFile> {
        let stream_len = buf.seek(SeekFrom::End(0))?;

        buf.seek(SeekFrom::Start(0))?;

        let magic = buf.read_u32::<LittleEndian>()?;

        buf.seek(SeekFrom::Start(0))?;

        match magic {
            MH_MAGIC_64 => Self::parse_object::<LittleEndian, R>(buf, stream_len),
            MH_CIGAM_64 => Self::parse_object::<BigEndian, R>(buf, stream_len),
            _ => Err(MachError::MalformedHeader(magic)),
        }
    }

    fn parse_object<O: ByteOrder, R: Read + Seek>(buf: &mut R, stream_len: u64) -> Result<ObjectFile> {
        let header = ObjectHeader::parse::<O, R>(buf)?;

        debug!("parsed object file header: {:?}", header);

        // ncmds comes from the file; each command is at least the 8-byte
        // tag/size pair, so bound the count before allocating.
        if u64::from(header.ncmds) * 8 > stream_len.saturating_sub(OBJECT_HEADER_SIZE) {
            return Err(MachError::TruncatedInput);
        }

        let mut commands = Vec::with_capacity(header.ncmds as usize);

        for _ in 0..header.ncmds {
            let (command, cmdsize) = LoadCommand::parse::<O, R>(buf, stream_len)?;

            commands.push(MachCommand(command, cmdsize));
        }

        debug!("parsed {} load commands", commands.len());

        resolve_symtab::<O, R>(&mut commands, buf, stream_len)?;

        Ok(ObjectFile { header, commands })
    }
}

#[cfg(test)]
pub mod tests {
    use std::io::Cursor;

    use byteorder::{BigEndian, WriteBytesExt};

    use super::*;
    use crate::commands::tests::{build_version, dysymtab, segment64, symtab};
    use crate::commands::{fixed_size_name, SegmentFlags};
    use crate::symbol::SymbolEntry;

    /**
    Mach header
          magic cputype cpusubtype  caps    filetype ncmds sizeofcmds      flags
     0xfeedfacf 16777223          3  0x80           2    15       2080 0x00a18085
    **/
    const OBJECT_HEADER_64_DATA: [u8; 32] = [
        0xcf, 0xfa, 0xed, 0xfe, 0x7, 0x0, 0x0, 0x1, 0x3, 0x0, 0x0, 0x80, 0x2, 0x0, 0x0, 0x0, 0xf, 0x0, 0x0, 0x0,
        0x20, 0x8, 0x0, 0x0, 0x85, 0x80, 0xa1, 0x0, 0x0, 0x0, 0x0, 0x0,
    ];

    /// A complete little-endian object file from a header and raw
    /// command records, with `trailer` appended after the commands for
    /// out-of-line tables.
    pub fn object_file(cmds: &[Vec<u8>], trailer: &[u8]) -> Vec<u8> {
        let sizeofcmds: usize = cmds.iter().map(|c| c.len()).sum();
        let mut buf = Vec::new();

        buf.extend_from_slice(&MH_MAGIC_64.to_le_bytes());
        buf.extend_from_slice(&CPU_TYPE_ARM64.to_le_bytes());
        buf.extend_from_slice(&0i32.to_le_bytes());
        buf.extend_from_slice(&MH_OBJECT.to_le_bytes());
        buf.extend_from_slice(&(cmds.len() as u32).to_le_bytes());
        buf.extend_from_slice(&(sizeofcmds as u32).to_le_bytes());
        buf.extend_from_slice(&0u32.to_le_bytes());
        buf.extend_from_slice(&0u32.to_le_bytes());

        for cmd in cmds {
            buf.extend_from_slice(cmd);
        }

        buf.extend_from_slice(trailer);

        buf
    }

    fn parse(buf: Vec<u8>) -> Result<ObjectFile> {
        ObjectFile::parse(&mut Cursor::new(buf))
    }

    #[test]
    fn test_parse_object_header() {
        let mut cur = Cursor::new(&OBJECT_HEADER_64_DATA[..]);
        let header = ObjectHeader::parse::<LittleEndian, _>(&mut cur).unwrap();

        assert_eq!(header.magic, MH_MAGIC_64);
        assert_eq!(header.cputype, CPU_TYPE_X86_64);
        assert_eq!(header.cpusubtype, 0x80000003u64 as i32);
        assert_eq!(header.filetype, MH_EXECUTE);
        assert_eq!(header.ncmds, 15);
        assert_eq!(header.sizeofcmds, 2080);
        assert_eq!(header.flags, 0x00a18085);
        assert_eq!(header.reserved, 0);
        assert_eq!(cur.position(), OBJECT_HEADER_SIZE);
    }

    #[test]
    fn test_round_trip_in_source_order() {
        let cmds = vec![
            segment64("__TEXT", &[("__text", "__TEXT")]),
            dysymtab(),
            build_version(0),
        ];
        let file = parse(object_file(&cmds, &[])).unwrap();

        assert_eq!(file.header.ncmds, 3);
        assert_eq!(file.commands.len(), 3);
        assert_eq!(file.commands[0].0.cmd(), LC_SEGMENT_64);
        assert_eq!(file.commands[1].0.cmd(), LC_DYSYMTAB);
        assert_eq!(file.commands[2].0.cmd(), LC_BUILD_VERSION);
        assert_eq!(file.commands[0].1, 72 + 80);

        if let LoadCommand::Segment64 {
            segname,
            flags,
            ref sections,
            ..
        } = file.commands[0].0
        {
            assert_eq!(fixed_size_name(&segname), "__TEXT");
            assert_eq!(flags, SegmentFlags::NORELOC);
            assert_eq!(sections.len(), 1);
        } else {
            panic!("expected Segment64");
        }
    }

    #[test]
    fn test_malformed_magic() {
        let mut buf = object_file(&[], &[]);

        buf[0] = 0xce; // MH_MAGIC, 32-bit

        match parse(buf) {
            Err(MachError::MalformedHeader(magic)) => assert_eq!(magic, 0xfeedface),
            other => panic!("expected MalformedHeader, got {:?}", other),
        }
    }

    #[test]
    fn test_truncated_header() {
        let mut buf = object_file(&[], &[]);

        buf.truncate(20); // inside the ncmds word's neighborhood

        match parse(buf) {
            Err(MachError::TruncatedInput) => {}
            other => panic!("expected TruncatedInput, got {:?}", other),
        }
    }

    #[test]
    fn test_unknown_tag_aborts_decode() {
        let mut bogus = Vec::new();

        bogus.extend_from_slice(&0x1bu32.to_le_bytes()); // LC_UUID
        bogus.extend_from_slice(&24u32.to_le_bytes());
        bogus.extend_from_slice(&[0u8; 16]);

        let cmds = vec![segment64("__TEXT", &[]), bogus, dysymtab()];

        match parse(object_file(&cmds, &[])) {
            Err(MachError::UnsupportedLoadCommand(0x1b)) => {}
            other => panic!("expected UnsupportedLoadCommand, got {:?}", other),
        }
    }

    #[test]
    fn test_oversized_ncmds_rejected() {
        let mut buf = object_file(&[], &[]);

        buf[16..20].copy_from_slice(&u32::MAX.to_le_bytes());

        match parse(buf) {
            Err(MachError::TruncatedInput) => {}
            other => panic!("expected TruncatedInput, got {:?}", other),
        }
    }

    #[test]
    fn test_symtab_resolution() {
        // header(32) + symtab cmd(24) = 56; string table there, symbols after
        let strtab = b"\0main\0_helper\0";
        let stroff = 56u32;
        let symoff = stroff + strtab.len() as u32;

        let mut trailer = strtab.to_vec();

        // one nlist_64 entry referring to "main"
        trailer.extend_from_slice(&1u32.to_le_bytes()); // n_strx
        trailer.push(0x0f); // n_type N_SECT | N_EXT
        trailer.push(1); // n_sect
        trailer.extend_from_slice(&0u16.to_le_bytes()); // n_desc
        trailer.extend_from_slice(&0x1000u64.to_le_bytes()); // n_value

        let cmds = vec![symtab(symoff, 1, stroff, strtab.len() as u32)];
        let file = parse(object_file(&cmds, &trailer)).unwrap();

        if let LoadCommand::SymTab {
            ref strtab,
            ref symbols,
            ..
        } = file.commands[0].0
        {
            assert_eq!(symbols.len(), 1);
            assert_eq!(
                symbols[0],
                SymbolEntry {
                    n_strx: 1,
                    n_type: 0x0f,
                    n_sect: 1,
                    n_desc: 0,
                    n_value: 0x1000,
                }
            );
            assert_eq!(symbols[0].name(strtab).unwrap(), "main");
        } else {
            panic!("expected SymTab");
        }
    }

    #[test]
    fn test_no_symtab_is_a_noop() {
        let cmds = vec![segment64("__TEXT", &[]), build_version(0)];
        let file = parse(object_file(&cmds, &[])).unwrap();

        assert_eq!(file.commands.len(), 2);

        for command in &file.commands {
            assert_ne!(command.0.cmd(), LC_SYMTAB);
        }
    }

    #[test]
    fn test_first_symtab_wins() {
        let strtab = b"\0one\0";
        // header(32) + two symtab cmds(48) = 80
        let stroff = 80u32;
        let symoff = stroff + strtab.len() as u32;

        let mut trailer = strtab.to_vec();

        trailer.extend_from_slice(&1u32.to_le_bytes());
        trailer.push(0x0f);
        trailer.push(1);
        trailer.extend_from_slice(&0u16.to_le_bytes());
        trailer.extend_from_slice(&0u64.to_le_bytes());

        // the second symtab points far out of range; it must never be
        // dereferenced
        let cmds = vec![
            symtab(symoff, 1, stroff, strtab.len() as u32),
            symtab(0xdead_0000, 99, 0xbeef_0000, 4096),
        ];
        let file = parse(object_file(&cmds, &trailer)).unwrap();

        if let LoadCommand::SymTab { ref symbols, ref strtab, .. } = file.commands[0].0 {
            assert_eq!(symbols.len(), 1);
            assert_eq!(symbols[0].name(strtab).unwrap(), "one");
        } else {
            panic!("expected SymTab");
        }

        if let LoadCommand::SymTab { ref symbols, ref strtab, .. } = file.commands[1].0 {
            assert!(symbols.is_empty());
            assert!(strtab.is_empty());
        } else {
            panic!("expected SymTab");
        }
    }

    #[test]
    fn test_symtab_offsets_out_of_range() {
        let cmds = vec![symtab(0x1000, 1, 0x2000, 64)];

        match parse(object_file(&cmds, &[])) {
            Err(MachError::SeekFailure(off)) => assert_eq!(off, 0x2000),
            other => panic!("expected SeekFailure, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_big_endian_object() {
        let mut buf = Vec::new();

        buf.write_u32::<BigEndian>(MH_MAGIC_64).unwrap();
        buf.write_i32::<BigEndian>(CPU_TYPE_POWERPC64).unwrap();
        buf.write_i32::<BigEndian>(0).unwrap();
        buf.write_u32::<BigEndian>(MH_EXECUTE).unwrap();
        buf.write_u32::<BigEndian>(1).unwrap(); // ncmds
        buf.write_u32::<BigEndian>(24).unwrap(); // sizeofcmds
        buf.write_u32::<BigEndian>(0).unwrap();
        buf.write_u32::<BigEndian>(0).unwrap();

        buf.write_u32::<BigEndian>(LC_BUILD_VERSION).unwrap();
        buf.write_u32::<BigEndian>(24).unwrap();
        buf.write_u32::<BigEndian>(PLATFORM_MACOS).unwrap();
        buf.write_u32::<BigEndian>(0x000a0f00).unwrap();
        buf.write_u32::<BigEndian>(0x000a0f00).unwrap();
        buf.write_u32::<BigEndian>(0).unwrap();

        let file = parse(buf).unwrap();

        assert_eq!(file.header.magic, MH_MAGIC_64);
        assert_eq!(file.header.cputype, CPU_TYPE_POWERPC64);
        assert_eq!(file.commands.len(), 1);
        assert_eq!(file.commands[0].0.cmd(), LC_BUILD_VERSION);
    }
}
