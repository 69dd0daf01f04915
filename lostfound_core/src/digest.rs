/// A fingerprint of a structure's observable state. Two values with equal
/// state produce equal digests within one build of the program.
pub type DigestOutput = u64;

pub trait Digestible {
    fn digest(&self) -> DigestOutput;
}
