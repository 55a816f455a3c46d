use std::borrow::Cow;
use std::io::{Read, Seek, SeekFrom};

use byteorder::{ByteOrder, ReadBytesExt};
use log::debug;

use crate::commands::LoadCommand;
use crate::errors::*;
use crate::loader::MachCommand;

// The n_type field really contains four fields:
//  unsigned char N_STAB:3,
//            N_PEXT:1,
//            N_TYPE:3,
//            N_EXT:1;
// which are used via the following masks.
//
/// if any of these bits set, a symbolic debugging entry
const N_STAB: u8 = 0xe0;
/// mask for the type bits
const N_TYPE: u8 = 0x0e;
/// external symbol bit, set for external symbols
const N_EXT: u8 = 0x01;

// Values for N_TYPE bits of the n_type field.
//
const N_UNDF: u8 = 0x0;
const N_ABS: u8 = 0x2;
const N_SECT: u8 = 0xe;
const N_PBUD: u8 = 0xc;
const N_INDR: u8 = 0xa;

/// What the N_TYPE bits of an entry classify it as.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum SymbolKind {
    /// undefined, n_sect == NO_SECT
    Undefined,
    /// absolute, n_sect == NO_SECT
    Absolute,
    /// defined in section number n_sect
    Defined,
    /// prebound undefined (defined in a dylib)
    Prebound,
    /// indirect
    Indirect,
}

/// One fixed-size nlist_64 entry of the symbol table.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub struct SymbolEntry {
    /// index into the string table
    pub n_strx: u32,
    /// type flag
    pub n_type: u8,
    /// section number or NO_SECT
    pub n_sect: u8,
    /// see <mach-o/stab.h>
    pub n_desc: u16,
    /// value of this symbol (or stab offset)
    pub n_value: u64,
}

impl SymbolEntry {
    pub const SIZE: u64 = 16;

    fn parse<O: ByteOrder, R: Read>(buf: &mut R) -> Result<SymbolEntry> {
        Ok(SymbolEntry {
            n_strx: buf.read_u32::<O>()?,
            n_type: buf.read_u8()?,
            n_sect: buf.read_u8()?,
            n_desc: buf.read_u16::<O>()?,
            n_value: buf.read_u64::<O>()?,
        })
    }

    /// The entry's name: the NUL-delimited bytes at `n_strx` in the
    /// string table, or `None` when the offset lies outside it.
    pub fn name<'a>(&self, strtab: &'a [u8]) -> Option<Cow<'a, str>> {
        let tail = strtab.get(self.n_strx as usize..)?;
        let len = tail.iter().position(|&b| b == 0).unwrap_or(tail.len());

        Some(String::from_utf8_lossy(&tail[..len]))
    }

    pub fn kind(&self) -> Option<SymbolKind> {
        match self.n_type & N_TYPE {
            N_UNDF => Some(SymbolKind::Undefined),
            N_ABS => Some(SymbolKind::Absolute),
            N_SECT => Some(SymbolKind::Defined),
            N_PBUD => Some(SymbolKind::Prebound),
            N_INDR => Some(SymbolKind::Indirect),
            _ => None,
        }
    }

    pub fn is_external(&self) -> bool {
        (self.n_type & N_EXT) == N_EXT
    }

    pub fn is_debug(&self) -> bool {
        (self.n_type & N_STAB) != 0
    }
}

/// Second decode pass: locate the first LC_SYMTAB command and attach its
/// string table and symbol entries, read from the out-of-line file
/// offsets it declares.
///
/// No symtab command is not an error; later symtab commands are left
/// untouched and their offsets never dereferenced.
pub(crate) fn resolve_symtab<O: ByteOrder, R: Read + Seek>(
    commands: &mut [MachCommand],
    buf: &mut R,
    stream_len: u64,
) -> Result<()> {
    for command in commands.iter_mut() {
        if let LoadCommand::SymTab {
            symoff,
            nsyms,
            stroff,
            strsize,
            ref mut strtab,
            ref mut symbols,
        } = command.0
        {
            if u64::from(stroff) + u64::from(strsize) > stream_len {
                return Err(MachError::SeekFailure(u64::from(stroff)));
            }

            if u64::from(symoff) + u64::from(nsyms) * SymbolEntry::SIZE > stream_len {
                return Err(MachError::SeekFailure(u64::from(symoff)));
            }

            buf.seek(SeekFrom::Start(u64::from(stroff)))
                .map_err(|_| MachError::SeekFailure(u64::from(stroff)))?;

            let mut table = vec![0u8; strsize as usize];

            buf.read_exact(&mut table)?;

            buf.seek(SeekFrom::Start(u64::from(symoff)))
                .map_err(|_| MachError::SeekFailure(u64::from(symoff)))?;

            let mut entries = Vec::with_capacity(nsyms as usize);

            for _ in 0..nsyms {
                entries.push(SymbolEntry::parse::<O, R>(buf)?);
            }

            debug!(
                "resolved symbol table, {} symbols, {} string table bytes",
                entries.len(),
                table.len()
            );

            *strtab = table;
            *symbols = entries;

            break;
        }
    }

    Ok(())
}
