use std::io::Write;

use flexi_logger::{DeferredNow, style};
use log::Record;

const TS_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.3f";

/// `2026-01-01 12:00:00.000 INFO  [vsx_core::auth::lifecycle] Token cleared`
pub fn cli_format(
    w: &mut dyn Write,
    now: &mut DeferredNow,
    record: &Record,
) -> Result<(), std::io::Error> {
    let level = record.level();
    write!(
        w,
        "{} {} [{}] {}",
        now.format(TS_FORMAT),
        style(level).paint(format!("{level:<5}")),
        record.target(),
        record.args()
    )
}
