//! Compiled-in keyboards.

pub mod c64;
pub mod vic20;

use crate::DeviceProfile;

/// Every supported keyboard.
pub static ALL: [&DeviceProfile; 2] = [&c64::PROFILE, &vic20::PROFILE];

pub fn by_name(name: &str) -> Option<&'static DeviceProfile> {
    ALL.iter()
        .copied()
        .find(|p| p.name.eq_ignore_ascii_case(name))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_profiles_validate() {
        for profile in ALL {
            assert_eq!(profile.validate(), Ok(()), "{}", profile.name);
        }
    }

    #[test]
    fn lookup_by_name() {
        assert_eq!(by_name("C64").map(|p| p.name), Some("c64"));
        assert_eq!(by_name("vic20").map(|p| p.key_count()), Some(64));
        assert!(by_name("amiga").is_none());
    }
}
