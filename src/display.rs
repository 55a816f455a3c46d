use std::fmt;

use crate::commands::LoadCommand;
use crate::consts::*;
use crate::loader::{MachCommand, ObjectHeader};
use crate::symbol::{SymbolEntry, SymbolKind};

impl fmt::Display for ObjectHeader {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(f, "Mach header")?;
        writeln!(
            f,
            "      magic    cputype cpusubtype filetype ncmds sizeofcmds      flags   reserved"
        )?;
        writeln!(
            f,
            " 0x{:08x} 0x{:08x} 0x{:08x} 0x{:06x} {:5} {:10} 0x{:08x} 0x{:08x}",
            self.magic,
            self.cputype,
            self.cpusubtype,
            self.filetype,
            self.ncmds,
            self.sizeofcmds,
            self.flags,
            self.reserved
        )
    }
}

impl fmt::Display for MachCommand {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.0 {
            LoadCommand::Segment64 { .. } => self.print_segment_command(f),
            LoadCommand::SymTab { .. } => self.print_symtab_command(f),
            LoadCommand::DySymTab { .. } => self.print_dysymtab_command(f),
            LoadCommand::BuildVersion { .. } => self.print_build_version_command(f),
        }
    }
}

impl MachCommand {
    fn print_segment_command(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let MachCommand(ref cmd, cmdsize) = *self;

        if let LoadCommand::Segment64 {
            ref segname,
            vmaddr,
            vmsize,
            fileoff,
            filesize,
            maxprot,
            initprot,
            flags,
            ref sections,
        } = *cmd
        {
            writeln!(f, "      cmd {}", cmd.name())?;
            writeln!(f, "  cmdsize {}", cmdsize)?;
            writeln!(f, "  segname {}", crate::commands::fixed_size_name(segname))?;
            writeln!(f, "   vmaddr 0x{:016x}", vmaddr)?;
            writeln!(f, "   vmsize 0x{:016x}", vmsize)?;
            writeln!(f, "  fileoff {}", fileoff)?;
            writeln!(f, " filesize {}", filesize)?;
            writeln!(f, "  maxprot 0x{:08x}", maxprot)?;
            writeln!(f, " initprot 0x{:08x}", initprot)?;
            writeln!(f, "   nsects {}", sections.len())?;
            writeln!(f, "    flags 0x{:x}", flags.bits())?;

            for section in sections {
                writeln!(f, "Section")?;
                writeln!(f, "  sectname {}", section.sectname())?;
                writeln!(
                    f,
                    "   segname {}{}",
                    section.segname(),
                    if section.segname != *segname {
                        " (does not match segment)"
                    } else {
                        ""
                    }
                )?;
                writeln!(f, "      addr 0x{:016x}", section.addr)?;
                writeln!(f, "      size 0x{:016x}", section.size)?;
                writeln!(f, "    offset {}", section.offset)?;
                writeln!(f, "     align 2^{} ({})", section.align, 1u64 << section.align.min(63))?;
                writeln!(f, "    reloff {}", section.reloff)?;
                writeln!(f, "    nreloc {}", section.nreloc)?;
                writeln!(f, "     flags 0x{:08x}", section.flags)?;
                writeln!(f, " reserved1 {}", section.reserved1)?;
                writeln!(f, " reserved2 {}", section.reserved2)?;
                writeln!(f, " reserved3 {}", section.reserved3)?;
            }

            Ok(())
        } else {
            unreachable!();
        }
    }

    fn print_symtab_command(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let MachCommand(ref cmd, cmdsize) = *self;

        if let LoadCommand::SymTab {
            symoff,
            nsyms,
            stroff,
            strsize,
            ref strtab,
            ref symbols,
        } = *cmd
        {
            writeln!(f, "     cmd {}", cmd.name())?;
            writeln!(f, " cmdsize {}", cmdsize)?;
            writeln!(f, "  symoff {}", symoff)?;
            writeln!(f, "   nsyms {}", nsyms)?;
            writeln!(f, "  stroff {}", stroff)?;
            writeln!(f, " strsize {}", strsize)?;

            for symbol in symbols {
                print_symbol(f, symbol, strtab)?;
            }

            Ok(())
        } else {
            unreachable!();
        }
    }

    fn print_dysymtab_command(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let MachCommand(ref cmd, cmdsize) = *self;

        if let LoadCommand::DySymTab {
            ilocalsym,
            nlocalsym,
            iextdefsym,
            nextdefsym,
            iundefsym,
            nundefsym,
            tocoff,
            ntoc,
            modtaboff,
            nmodtab,
            extrefsymoff,
            nextrefsyms,
            indirectsymoff,
            nindirectsyms,
            extreloff,
            nextrel,
            locreloff,
            nlocrel,
        } = *cmd
        {
            writeln!(f, "            cmd {}", cmd.name())?;
            writeln!(f, "        cmdsize {}", cmdsize)?;
            writeln!(f, "      ilocalsym {}", ilocalsym)?;
            writeln!(f, "      nlocalsym {}", nlocalsym)?;
            writeln!(f, "     iextdefsym {}", iextdefsym)?;
            writeln!(f, "     nextdefsym {}", nextdefsym)?;
            writeln!(f, "      iundefsym {}", iundefsym)?;
            writeln!(f, "      nundefsym {}", nundefsym)?;
            writeln!(f, "         tocoff {}", tocoff)?;
            writeln!(f, "           ntoc {}", ntoc)?;
            writeln!(f, "      modtaboff {}", modtaboff)?;
            writeln!(f, "        nmodtab {}", nmodtab)?;
            writeln!(f, "   extrefsymoff {}", extrefsymoff)?;
            writeln!(f, "    nextrefsyms {}", nextrefsyms)?;
            writeln!(f, " indirectsymoff {}", indirectsymoff)?;
            writeln!(f, "  nindirectsyms {}", nindirectsyms)?;
            writeln!(f, "      extreloff {}", extreloff)?;
            writeln!(f, "        nextrel {}", nextrel)?;
            writeln!(f, "      locreloff {}", locreloff)?;
            writeln!(f, "        nlocrel {}", nlocrel)
        } else {
            unreachable!();
        }
    }

    fn print_build_version_command(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let MachCommand(ref cmd, cmdsize) = *self;

        if let LoadCommand::BuildVersion {
            platform,
            minos,
            sdk,
            ntools,
        } = *cmd
        {
            writeln!(f, "      cmd {}", cmd.name())?;
            writeln!(f, "  cmdsize {}", cmdsize)?;
            match platform_name(platform) {
                Some(name) => writeln!(f, " platform {}", name)?,
                None => writeln!(f, " platform 0x{:08x}", platform)?,
            }
            writeln!(f, "    minos {}", minos)?;
            writeln!(f, "      sdk {}", sdk)?;
            writeln!(f, "   ntools {} (not decoded)", ntools)
        } else {
            unreachable!();
        }
    }
}

fn print_symbol(f: &mut fmt::Formatter, symbol: &SymbolEntry, strtab: &[u8]) -> fmt::Result {
    let letter = match symbol.kind() {
        Some(SymbolKind::Undefined) => "u",
        Some(SymbolKind::Absolute) => "a",
        Some(SymbolKind::Defined) => "d",
        Some(SymbolKind::Prebound) => "p",
        Some(SymbolKind::Indirect) => "i",
        None => "?",
    };
    let letter = if symbol.is_external() {
        letter.to_uppercase()
    } else {
        letter.to_string()
    };

    writeln!(
        f,
        "  {:016x} {} {:02x} {:02x} {:04x} {}",
        symbol.n_value,
        letter,
        symbol.n_type,
        symbol.n_sect,
        symbol.n_desc,
        symbol.name(strtab).unwrap_or_else(|| "<bad string offset>".into())
    )
}
