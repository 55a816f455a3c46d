#![allow(non_camel_case_types)]

pub type cpu_type_t = i32;
pub type cpu_subtype_t = i32;
pub type vm_prot_t = i32;

/// mask for architecture bits
pub const CPU_ARCH_MASK: cpu_type_t = 0xff000000u64 as cpu_type_t;
/// 64 bit ABI
pub const CPU_ARCH_ABI64: cpu_type_t = 0x01000000;

pub const CPU_TYPE_X86: cpu_type_t = 7;
pub const CPU_TYPE_X86_64: cpu_type_t = CPU_TYPE_X86 | CPU_ARCH_ABI64;
pub const CPU_TYPE_ARM: cpu_type_t = 12;
pub const CPU_TYPE_ARM64: cpu_type_t = CPU_TYPE_ARM | CPU_ARCH_ABI64;
pub const CPU_TYPE_POWERPC: cpu_type_t = 18;
pub const CPU_TYPE_POWERPC64: cpu_type_t = CPU_TYPE_POWERPC | CPU_ARCH_ABI64;

// Constants for the magic field of the mach_header_64 (64-bit architectures)
//

/// the 64-bit mach magic number
pub const MH_MAGIC_64: u32 = 0xfeedfacf;
/// NXSwapInt(MH_MAGIC_64)
pub const MH_CIGAM_64: u32 = 0xcffaedfe;

// Constants for the filetype field of the mach_header
//

/// relocatable object file
pub const MH_OBJECT: u32 = 0x1;
/// demand paged executable file
pub const MH_EXECUTE: u32 = 0x2;
/// dynamically bound shared library
pub const MH_DYLIB: u32 = 0x6;
/// dynamically bound bundle file
pub const MH_BUNDLE: u32 = 0x8;
/// companion file with only debug sections
pub const MH_DSYM: u32 = 0xa;

// After MacOS X 10.1 when a new load command is added that is required to be
// understood by the dynamic linker for the image to execute properly the
// LC_REQ_DYLD bit will be or'ed into the load command constant.
//
pub const LC_REQ_DYLD: u32 = 0x80000000;

// Constants for the cmd field of all load commands, the type.
// Only the four tags below are decoded; every other value aborts the parse.

/// link-edit stab symbol table info
pub const LC_SYMTAB: u32 = 0x2;
/// dynamic link-edit symbol table info
pub const LC_DYSYMTAB: u32 = 0xb;
/// 64-bit segment of this file to be mapped
pub const LC_SEGMENT_64: u32 = 0x19;
/// build for platform min OS version
pub const LC_BUILD_VERSION: u32 = 0x32;

// Constants for the flags field of the segment_command_64

/// the file contents for this segment is for the high part of the VM space,
/// the low part is zero filled (for stacks in core files)
pub const SG_HIGHVM: u32 = 0x1;
/// this segment is the VM that is allocated by a fixed VM library,
/// for overlap checking in the link editor
pub const SG_FVMLIB: u32 = 0x2;
/// this segment has nothing that was relocated in it and nothing relocated to it,
/// that is it maybe safely replaced without relocation
pub const SG_NORELOC: u32 = 0x4;
/// This segment is protected.  If the segment starts at file offset 0,
/// the first page of the segment is not protected.
/// All other pages of the segment are protected.
pub const SG_PROTECTED_VERSION_1: u32 = 0x8;

// Known values for the platform field of the build_version_command
//

pub const PLATFORM_MACOS: u32 = 1;
pub const PLATFORM_IOS: u32 = 2;
pub const PLATFORM_TVOS: u32 = 3;
pub const PLATFORM_WATCHOS: u32 = 4;
pub const PLATFORM_BRIDGEOS: u32 = 5;
pub const PLATFORM_MACCATALYST: u32 = 6;
pub const PLATFORM_IOSSIMULATOR: u32 = 7;
pub const PLATFORM_TVOSSIMULATOR: u32 = 8;
pub const PLATFORM_WATCHOSSIMULATOR: u32 = 9;
pub const PLATFORM_DRIVERKIT: u32 = 10;

pub fn platform_name(platform: u32) -> Option<&'static str> {
    match platform {
        PLATFORM_MACOS => Some("macOS"),
        PLATFORM_IOS => Some("iOS"),
        PLATFORM_TVOS => Some("tvOS"),
        PLATFORM_WATCHOS => Some("watchOS"),
        PLATFORM_BRIDGEOS => Some("bridgeOS"),
        PLATFORM_MACCATALYST => Some("Mac Catalyst"),
        PLATFORM_IOSSIMULATOR => Some("iOS Simulator"),
        PLATFORM_TVOSSIMULATOR => Some("tvOS Simulator"),
        PLATFORM_WATCHOSSIMULATOR => Some("watchOS Simulator"),
        PLATFORM_DRIVERKIT => Some("DriverKit"),
        _ => None,
    }
}
