mod extractors;

pub use extractors::AdminAuth;
