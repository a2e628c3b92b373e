//! The FAT directory entry attribute byte.

/// The attributes a directory entry can have.
///
/// A value of [`Attributes::LFN`] marks the entry as one fragment of a
/// long file name, which this library skips over.
#[cfg_attr(feature = "defmt-log", derive(defmt::Format))]
#[derive(Copy, Clone, PartialEq, Eq)]
pub struct Attributes(pub(crate) u8);

impl Attributes {
    /// The file cannot be written to.
    pub const READ_ONLY: u8 = 0x01;
    /// The file should not be shown in listings.
    pub const HIDDEN: u8 = 0x02;
    /// The file belongs to the operating system.
    pub const SYSTEM: u8 = 0x04;
    /// The entry holds the volume label, not a file.
    pub const VOLUME: u8 = 0x08;
    /// The entry is a directory.
    pub const DIRECTORY: u8 = 0x10;
    /// The file has been modified since it was last archived.
    pub const ARCHIVE: u8 = 0x20;
    /// The entry is a long-file-name fragment.
    pub const LFN: u8 = Self::READ_ONLY | Self::HIDDEN | Self::SYSTEM | Self::VOLUME;

    /// Create from the raw attribute byte of a directory entry.
    pub fn create_from_fat(value: u8) -> Attributes {
        Attributes(value)
    }

    /// Does this entry have the read-only attribute?
    pub fn is_read_only(self) -> bool {
        (self.0 & Self::READ_ONLY) == Self::READ_ONLY
    }

    /// Does this entry have the hidden attribute?
    pub fn is_hidden(self) -> bool {
        (self.0 & Self::HIDDEN) == Self::HIDDEN
    }

    /// Does this entry have the system attribute?
    pub fn is_system(self) -> bool {
        (self.0 & Self::SYSTEM) == Self::SYSTEM
    }

    /// Is this entry the volume label?
    pub fn is_volume(self) -> bool {
        (self.0 & Self::VOLUME) == Self::VOLUME
    }

    /// Is this entry a directory?
    pub fn is_directory(self) -> bool {
        (self.0 & Self::DIRECTORY) == Self::DIRECTORY
    }

    /// Does this entry have the archive attribute?
    pub fn is_archive(self) -> bool {
        (self.0 & Self::ARCHIVE) == Self::ARCHIVE
    }

    /// Is this entry a long-file-name fragment?
    pub fn is_lfn(self) -> bool {
        self.0 == Self::LFN
    }
}

impl core::fmt::Debug for Attributes {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        if self.is_lfn() {
            write!(f, "LFN")?;
        } else {
            if self.is_directory() {
                write!(f, "D")?;
            } else {
                write!(f, "F")?;
            }
            if self.is_read_only() {
                write!(f, "R")?;
            }
            if self.is_hidden() {
                write!(f, "H")?;
            }
            if self.is_system() {
                write!(f, "S")?;
            }
            if self.is_volume() {
                write!(f, "V")?;
            }
            if self.is_archive() {
                write!(f, "A")?;
            }
        }
        Ok(())
    }
}

// ****************************************************************************
//
// End Of File
//
// ****************************************************************************
