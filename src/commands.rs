use std::borrow::Cow;
use std::fmt;
use std::io::{Read, Seek, SeekFrom};

use bitflags::bitflags;
use byteorder::{ByteOrder, ReadBytesExt};
use log::debug;

use crate::consts::*;
use crate::errors::*;
use crate::symbol::SymbolEntry;

/// The encoded version.
///
///  X.Y.Z is encoded in nibbles xxxx.yy.zz
///
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub struct VersionTag(pub u32);

impl VersionTag {
    pub fn major(self) -> u32 {
        self.0 >> 16
    }

    pub fn minor(self) -> u32 {
        (self.0 >> 8) & 0xFF
    }

    pub fn release(self) -> u32 {
        self.0 & 0xFF
    }
}

impl From<VersionTag> for u32 {
    fn from(version: VersionTag) -> u32 {
        version.0
    }
}

impl fmt::Display for VersionTag {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if self.release() == 0 {
            write!(f, "{}.{}", self.major(), self.minor())
        } else {
            write!(f, "{}.{}.{}", self.major(), self.minor(), self.release())
        }
    }
}

bitflags! {
    /// Flags field of a segment_command_64.
    #[derive(Default)]
    pub struct SegmentFlags: u32 {
        const HIGHVM = SG_HIGHVM;
        const FVMLIB = SG_FVMLIB;
        const NORELOC = SG_NORELOC;
        const PROTECTED_VERSION_1 = SG_PROTECTED_VERSION_1;
    }
}

/// Render a fixed 16-byte name field.
///
/// Segment and section names are NUL-padded but not guaranteed to be
/// NUL-terminated, so they are kept as byte arrays and only trimmed at
/// the first NUL when displayed.
pub fn fixed_size_name(bytes: &[u8]) -> Cow<str> {
    let len = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());

    String::from_utf8_lossy(&bytes[..len])
}

/// A 64-bit section header inside a segment command.
///
/// The section structures directly follow the segment command and their
/// count is the segment's nsects field.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Section64 {
    /// name of this section
    pub sectname: [u8; 16],
    /// segment this section goes in
    pub segname: [u8; 16],
    /// memory address of this section
    pub addr: u64,
    /// size in bytes of this section
    pub size: u64,
    /// file offset of this section
    pub offset: u32,
    /// section alignment (power of 2)
    pub align: u32,
    /// file offset of relocation entries
    pub reloff: u32,
    /// number of relocation entries
    pub nreloc: u32,
    /// flags (section type and attributes)
    pub flags: u32,
    /// reserved (for offset or index)
    pub reserved1: u32,
    /// reserved (for count or sizeof)
    pub reserved2: u32,
    /// reserved
    pub reserved3: u32,
}

impl Section64 {
    pub const SIZE: u64 = 80;

    fn parse<O: ByteOrder, R: Read>(buf: &mut R) -> Result<Section64> {
        let mut sectname = [0u8; 16];
        let mut segname = [0u8; 16];

        buf.read_exact(&mut sectname)?;
        buf.read_exact(&mut segname)?;

        Ok(Section64 {
            sectname,
            segname,
            addr: buf.read_u64::<O>()?,
            size: buf.read_u64::<O>()?,
            offset: buf.read_u32::<O>()?,
            align: buf.read_u32::<O>()?,
            reloff: buf.read_u32::<O>()?,
            nreloc: buf.read_u32::<O>()?,
            flags: buf.read_u32::<O>()?,
            reserved1: buf.read_u32::<O>()?,
            reserved2: buf.read_u32::<O>()?,
            reserved3: buf.read_u32::<O>()?,
        })
    }

    pub fn sectname(&self) -> Cow<str> {
        fixed_size_name(&self.sectname)
    }

    pub fn segname(&self) -> Cow<str> {
        fixed_size_name(&self.segname)
    }
}

/// A load command decoded from the stream directly following the header.
///
/// Exactly one payload shape exists per recognized tag; an unrecognized
/// tag aborts the whole decode.
#[derive(Debug, Clone)]
pub enum LoadCommand {
    /// The 64-bit segment load command indicates that a part of this file
    /// is to be mapped into a 64-bit task's address space.
    ///
    /// If the segment has sections then section_64 structures directly
    /// follow the segment command and their size is reflected in cmdsize.
    ///
    Segment64 {
        /// segment name
        segname: [u8; 16],
        /// memory address of this segment
        vmaddr: u64,
        /// memory size of this segment
        vmsize: u64,
        /// file offset of this segment
        fileoff: u64,
        /// amount to map from the file
        filesize: u64,
        /// maximum VM protection
        maxprot: vm_prot_t,
        /// initial VM protection
        initprot: vm_prot_t,
        /// flags
        flags: SegmentFlags,
        /// sections
        sections: Vec<Section64>,
    },

    /// The symtab_command contains the offsets and sizes of the link-edit
    /// "stab" style symbol table information.
    ///
    /// The string and symbol tables themselves live elsewhere in the file;
    /// `strtab` and `symbols` stay empty until the resolver pass reads
    /// them from `stroff`/`symoff`.
    ///
    SymTab {
        /// symbol table offset
        symoff: u32,
        /// number of symbol table entries
        nsyms: u32,
        /// string table offset
        stroff: u32,
        /// string table size in bytes
        strsize: u32,
        /// the string table, NUL-delimited names indexed by byte offset
        strtab: Vec<u8>,
        /// the decoded symbol table entries
        symbols: Vec<SymbolEntry>,
    },

    /// This is the second set of the symbolic information which is used
    /// to support the data structures for the dynamic link editor.
    ///
    /// The offsets and counts partition the symbol table into local,
    /// externally defined and undefined ranges and describe the auxiliary
    /// tables. Stored verbatim, not further interpreted.
    ///
    DySymTab {
        /// index to local symbols
        ilocalsym: u32,
        /// number of local symbols
        nlocalsym: u32,
        /// index to externally defined symbols
        iextdefsym: u32,
        /// number of externally defined symbols
        nextdefsym: u32,
        /// index to undefined symbols
        iundefsym: u32,
        /// number of undefined symbols
        nundefsym: u32,
        /// file offset to table of contents
        tocoff: u32,
        /// number of entries in table of contents
        ntoc: u32,
        /// file offset to module table
        modtaboff: u32,
        /// number of module table entries
        nmodtab: u32,
        /// offset to referenced symbol table
        extrefsymoff: u32,
        /// number of referenced symbol table entries
        nextrefsyms: u32,
        /// file offset to the indirect symbol table
        indirectsymoff: u32,
        /// number of indirect symbol table entries
        nindirectsyms: u32,
        /// offset to external relocation entries
        extreloff: u32,
        /// number of external relocation entries
        nextrel: u32,
        /// offset to local relocation entries
        locreloff: u32,
        /// number of local relocation entries
        nlocrel: u32,
    },

    /// The build_version_command contains the min OS version on which
    /// this binary was built to run for its platform.
    ///
    /// The ntools tool entries that follow the fixed fields are not
    /// decoded; the cursor is realigned past them via cmdsize.
    ///
    BuildVersion {
        /// platform identifier
        platform: u32,
        /// X.Y.Z is encoded in nibbles xxxx.yy.zz
        minos: VersionTag,
        /// X.Y.Z is encoded in nibbles xxxx.yy.zz
        sdk: VersionTag,
        /// number of tool entries following this
        ntools: u32,
    },
}

const LOAD_COMMAND_HEADER_SIZE: u32 = 8; // cmd + cmdsize
const SEGMENT_COMMAND_64_SIZE: u64 = 64;

impl LoadCommand {
    /// Parse one load command at the current cursor position.
    ///
    /// On return the cursor sits at `begin + cmdsize`, whatever the body
    /// actually occupied, so declared-but-unread trailing data (the
    /// build-version tool entries, command padding) never misaligns the
    /// next record.
    pub fn parse<O: ByteOrder, R: Read + Seek>(buf: &mut R, stream_len: u64) -> Result<(LoadCommand, u32)> {
        let begin = buf.seek(SeekFrom::Current(0))?;
        let cmd = buf.read_u32::<O>()?;
        let cmdsize = buf.read_u32::<O>()?;

        if cmdsize < LOAD_COMMAND_HEADER_SIZE {
            return Err(MachError::InvalidCommandSize(cmdsize));
        }

        if begin + u64::from(cmdsize) > stream_len {
            return Err(MachError::TruncatedInput);
        }

        let command = match cmd {
            LC_SEGMENT_64 => {
                let mut segname = [0u8; 16];

                buf.read_exact(&mut segname)?;

                let vmaddr = buf.read_u64::<O>()?;
                let vmsize = buf.read_u64::<O>()?;
                let fileoff = buf.read_u64::<O>()?;
                let filesize = buf.read_u64::<O>()?;
                let maxprot = buf.read_i32::<O>()?;
                let initprot = buf.read_i32::<O>()?;
                let nsects = buf.read_u32::<O>()?;
                let flags = buf.read_u32::<O>()?;

                // nsects comes from the file; bound it by the remaining
                // stream before allocating or looping.
                let pos = begin + u64::from(LOAD_COMMAND_HEADER_SIZE) + SEGMENT_COMMAND_64_SIZE;

                if u64::from(nsects) * Section64::SIZE > stream_len.saturating_sub(pos) {
                    return Err(MachError::TruncatedInput);
                }

                let mut sections = Vec::with_capacity(nsects as usize);

                for _ in 0..nsects {
                    sections.push(Section64::parse::<O, R>(buf)?);
                }

                LoadCommand::Segment64 {
                    segname,
                    vmaddr,
                    vmsize,
                    fileoff,
                    filesize,
                    maxprot,
                    initprot,
                    flags: SegmentFlags::from_bits_truncate(flags),
                    sections,
                }
            }
            LC_SYMTAB => LoadCommand::SymTab {
                symoff: buf.read_u32::<O>()?,
                nsyms: buf.read_u32::<O>()?,
                stroff: buf.read_u32::<O>()?,
                strsize: buf.read_u32::<O>()?,
                strtab: Vec::new(),
                symbols: Vec::new(),
            },
            LC_DYSYMTAB => LoadCommand::DySymTab {
                ilocalsym: buf.read_u32::<O>()?,
                nlocalsym: buf.read_u32::<O>()?,
                iextdefsym: buf.read_u32::<O>()?,
                nextdefsym: buf.read_u32::<O>()?,
                iundefsym: buf.read_u32::<O>()?,
                nundefsym: buf.read_u32::<O>()?,
                tocoff: buf.read_u32::<O>()?,
                ntoc: buf.read_u32::<O>()?,
                modtaboff: buf.read_u32::<O>()?,
                nmodtab: buf.read_u32::<O>()?,
                extrefsymoff: buf.read_u32::<O>()?,
                nextrefsyms: buf.read_u32::<O>()?,
                indirectsymoff: buf.read_u32::<O>()?,
                nindirectsyms: buf.read_u32::<O>()?,
                extreloff: buf.read_u32::<O>()?,
                nextrel: buf.read_u32::<O>()?,
                locreloff: buf.read_u32::<O>()?,
                nlocrel: buf.read_u32::<O>()?,
            },
            LC_BUILD_VERSION => LoadCommand::BuildVersion {
                platform: buf.read_u32::<O>()?,
                minos: VersionTag(buf.read_u32::<O>()?),
                sdk: VersionTag(buf.read_u32::<O>()?),
                ntools: buf.read_u32::<O>()?,
            },
            _ => return Err(MachError::UnsupportedLoadCommand(cmd)),
        };

        let read = buf.seek(SeekFrom::Current(0))? - begin;

        debug!(
            "parsed {} command with {}/{} bytes",
            command.name(),
            read,
            cmdsize
        );

        if read > u64::from(cmdsize) {
            return Err(MachError::InvalidCommandSize(cmdsize));
        } else if read < u64::from(cmdsize) {
            // skip undecoded trailing data (tool entries, padding)
            buf.seek(SeekFrom::Start(begin + u64::from(cmdsize)))?;
        }

        Ok((command, cmdsize))
    }

    pub fn cmd(&self) -> u32 {
        match *self {
            LoadCommand::Segment64 { .. } => LC_SEGMENT_64,
            LoadCommand::SymTab { .. } => LC_SYMTAB,
            LoadCommand::DySymTab { .. } => LC_DYSYMTAB,
            LoadCommand::BuildVersion { .. } => LC_BUILD_VERSION,
        }
    }

    pub fn name(&self) -> &'static str {
        Self::cmd_name(self.cmd())
    }

    pub fn cmd_name(cmd: u32) -> &'static str {
        match cmd {
            LC_SYMTAB => "LC_SYMTAB",
            LC_DYSYMTAB => "LC_DYSYMTAB",
            LC_SEGMENT_64 => "LC_SEGMENT_64",
            LC_BUILD_VERSION => "LC_BUILD_VERSION",
            _ => "LC_COMMAND",
        }
    }
}
