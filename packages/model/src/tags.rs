/// One-byte tag carried by closed enumerations in the binary format.
pub trait Tagged: Sized + Copy {
    fn tag(self) -> u8;
    fn from_tag(tag: u8) -> Option<Self>;
}

macro_rules! tagged_enum {
    ($ty:ident { $($variant:ident = $tag:literal),+ $(,)? }) => {
        impl $crate::tags::Tagged for $ty {
            fn tag(self) -> u8 {
                match self {
                    $(Self::$variant => $tag,)+
                }
            }

            fn from_tag(tag: u8) -> Option<Self> {
                match tag {
                    $($tag => Some(Self::$variant),)+
                    _ => None,
                }
            }
        }
    };
}

pub(crate) use tagged_enum;
