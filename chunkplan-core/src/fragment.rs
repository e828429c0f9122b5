use crate::error::{PlanError, Result};
use crate::geometry::{
    BLOCKS_PER_CHUNK, MAX_XOR_LEVEL, MIN_XOR_LEVEL, blocks_in_data_part, blocks_in_parity_part,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

const ID_STRIDE: u8 = MAX_XOR_LEVEL + 1;

/// Role of an XOR fragment inside its level. Data parts sort before parity.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum XorSlot {
    Data(u8),
    Parity,
}

/// One slot of an XOR level. Only constructible with a valid (level, slot).
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct XorFragment {
    level: u8,
    slot: XorSlot,
}

impl XorFragment {
    pub fn new(level: u8, slot: XorSlot) -> Result<Self> {
        if !(MIN_XOR_LEVEL..=MAX_XOR_LEVEL).contains(&level) {
            return Err(PlanError::InvalidXorLevel(level));
        }
        if let XorSlot::Data(part) = slot {
            if part == 0 || part > level {
                return Err(PlanError::InvalidXorPart { level, part });
            }
        }
        Ok(Self { level, slot })
    }

    pub fn level(&self) -> u8 {
        self.level
    }

    pub fn slot(&self) -> XorSlot {
        self.slot
    }
}

/// A storable piece of a chunk: the full replica or one XOR slot.
///
/// The derived ordering is the canonical one: `Standard` first, then by
/// level, then by slot with parity last.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum FragmentType {
    Standard,
    Xor(XorFragment),
}

impl FragmentType {
    pub fn xor_data(level: u8, part: u8) -> Result<Self> {
        XorFragment::new(level, XorSlot::Data(part)).map(FragmentType::Xor)
    }

    pub fn xor_parity(level: u8) -> Result<Self> {
        XorFragment::new(level, XorSlot::Parity).map(FragmentType::Xor)
    }

    /// Every data part of `level` followed by its parity.
    pub fn all_of_level(level: u8) -> Result<Vec<Self>> {
        let mut out = (1..=level)
            .map(|part| Self::xor_data(level, part))
            .collect::<Result<Vec<_>>>()?;
        out.push(Self::xor_parity(level)?);
        Ok(out)
    }

    pub fn is_standard(&self) -> bool {
        matches!(self, FragmentType::Standard)
    }

    pub fn is_parity(&self) -> bool {
        matches!(self, FragmentType::Xor(x) if x.slot == XorSlot::Parity)
    }

    pub fn level(&self) -> Option<u8> {
        match self {
            FragmentType::Standard => None,
            FragmentType::Xor(x) => Some(x.level),
        }
    }

    pub fn data_part(&self) -> Option<u8> {
        match self {
            FragmentType::Xor(XorFragment {
                slot: XorSlot::Data(part),
                ..
            }) => Some(*part),
            _ => None,
        }
    }

    /// Number of blocks stored on disk for this fragment.
    pub fn blocks_stored(&self) -> u32 {
        match self {
            FragmentType::Standard => BLOCKS_PER_CHUNK,
            FragmentType::Xor(x) => match x.slot {
                XorSlot::Data(part) => blocks_in_data_part(x.level, part),
                XorSlot::Parity => blocks_in_parity_part(x.level),
            },
        }
    }

    /// Compact one-byte identifier used on the wire.
    pub fn id(&self) -> u8 {
        match self {
            FragmentType::Standard => 0,
            FragmentType::Xor(x) => {
                let part = match x.slot {
                    XorSlot::Data(part) => part,
                    XorSlot::Parity => 0,
                };
                x.level * ID_STRIDE + part
            }
        }
    }
}

impl TryFrom<u8> for FragmentType {
    type Error = PlanError;

    fn try_from(id: u8) -> Result<Self> {
        if id == 0 {
            return Ok(FragmentType::Standard);
        }
        let (level, part) = (id / ID_STRIDE, id % ID_STRIDE);
        let slot = match part {
            0 => XorSlot::Parity,
            p => XorSlot::Data(p),
        };
        XorFragment::new(level, slot)
            .map(FragmentType::Xor)
            .map_err(|_| PlanError::UnknownFragmentId(id))
    }
}

impl fmt::Display for FragmentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FragmentType::Standard => f.write_str("standard"),
            FragmentType::Xor(x) => match x.slot {
                XorSlot::Data(part) => write!(f, "xor_{}_of_{}", part, x.level),
                XorSlot::Parity => write!(f, "xor_p_of_{}", x.level),
            },
        }
    }
}

impl FromStr for FragmentType {
    type Err = PlanError;

    fn from_str(s: &str) -> Result<Self> {
        let unknown = || PlanError::UnknownFragmentName(s.to_string());
        if s == "standard" {
            return Ok(FragmentType::Standard);
        }
        let (part, level) = s
            .strip_prefix("xor_")
            .and_then(|rest| rest.split_once("_of_"))
            .ok_or_else(unknown)?;
        let level: u8 = level.parse().map_err(|_| unknown())?;
        if part == "p" {
            FragmentType::xor_parity(level)
        } else {
            let part: u8 = part.parse().map_err(|_| unknown())?;
            FragmentType::xor_data(level, part)
        }
    }
}

impl TryFrom<String> for FragmentType {
    type Error = PlanError;

    fn try_from(s: String) -> Result<Self> {
        s.parse()
    }
}

impl From<FragmentType> for String {
    fn from(f: FragmentType) -> Self {
        f.to_string()
    }
}
