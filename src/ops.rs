mod range;

pub use self::range::Interval;
