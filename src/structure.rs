//! Macros for decoding fields out of little-endian on-disk structures.

macro_rules! define_field {
    ($name:ident, u8, $offset:expr, $doc:literal) => {
        #[doc = $doc]
        pub fn $name(&self) -> u8 {
            self.data[$offset]
        }
    };
    ($name:ident, u16, $offset:expr, $doc:literal) => {
        #[doc = $doc]
        pub fn $name(&self) -> u16 {
            LittleEndian::read_u16(&self.data[$offset..$offset + 2])
        }
    };
    ($name:ident, u32, $offset:expr, $doc:literal) => {
        #[doc = $doc]
        pub fn $name(&self) -> u32 {
            LittleEndian::read_u32(&self.data[$offset..$offset + 4])
        }
    };
}

// ****************************************************************************
//
// End Of File
//
// ****************************************************************************
