//! Chromium automation through Playwright.

pub mod driver;

pub use driver::PlaywrightDriver;
