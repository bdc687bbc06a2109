//! Build script: stamp the protocol version string and write a man page.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use time::{OffsetDateTime, macros::format_description};

const EPOCH_DATE: &str = "Jan 01 1970";
const PAGE_NAME: &str = "gahp-server.1";

/// `Mon DD YYYY` taken from `SOURCE_DATE_EPOCH` when set.
fn stamp_date() -> String {
    let Ok(raw) = env::var("SOURCE_DATE_EPOCH") else {
        return EPOCH_DATE.to_owned();
    };
    raw.parse::<i64>()
        .ok()
        .and_then(|seconds| OffsetDateTime::from_unix_timestamp(seconds).ok())
        .and_then(|moment| {
            moment
                .format(format_description!("[month repr:short] [day] [year]"))
                .ok()
        })
        .unwrap_or_else(|| {
            println!("cargo:warning=ignoring SOURCE_DATE_EPOCH '{raw}'; stamping {EPOCH_DATE}");
            EPOCH_DATE.to_owned()
        })
}

/// Packaging location: `target/generated-man/<triple>/<profile>`.
fn packaging_dir(out_dir: &Path) -> PathBuf {
    // OUT_DIR is target/<profile>/build/<crate>-<hash>/out.
    let target_root = out_dir
        .ancestors()
        .nth(4)
        .map_or_else(|| PathBuf::from("target"), Path::to_path_buf);
    let triple = env::var("TARGET").unwrap_or_else(|_| "unknown-target".to_owned());
    let profile = env::var("PROFILE").unwrap_or_else(|_| "unknown-profile".to_owned());
    target_root.join("generated-man").join(triple).join(profile)
}

fn man_page(version: &str, date: &str) -> String {
    format!(
        ".TH \"GAHP-SERVER\" \"1\" \"{date}\" \"gahp-server {version}\" \"GAHP Helper\"\n\
.SH NAME\n\
gahp-server \\- line-protocol helper server\n\
.SH SYNOPSIS\n\
.B gahp-server\n\
[\\fB\\-\\-log\\-filter\\fR \\fIFILTER\\fR]\n\
[\\fB\\-\\-log\\-format\\fR \\fIjson|compact\\fR]\n\
[\\fB\\-\\-gahp\\-version\\fR \\fIVERSION\\fR]\n\
.SH DESCRIPTION\n\
Reads one command per line on standard input and answers on standard\n\
output. Deferred results are collected with RESULTS; in async mode an\n\
unsolicited R line announces that results are waiting. Logs go to\n\
standard error.\n\
.SH ENVIRONMENT\n\
GAHP_LOG_FILTER, GAHP_LOG_FORMAT and GAHP_GAHP_VERSION mirror the flags.\n"
    )
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("cargo:rerun-if-env-changed=SOURCE_DATE_EPOCH");

    let version = env::var("CARGO_PKG_VERSION")?;
    let out_dir = PathBuf::from(env::var_os("OUT_DIR").ok_or("OUT_DIR is not set")?);
    let date = stamp_date();

    // Spaces inside the product name are escaped for the wire.
    println!("cargo:rustc-env=GAHP_VERSION_STRING=$GahpVersion: {version} {date} Rust\\ Gahp $");

    let page = man_page(&version, &date);
    fs::write(out_dir.join(PAGE_NAME), &page)?;
    let packaging = packaging_dir(&out_dir);
    fs::create_dir_all(&packaging)?;
    fs::write(packaging.join(PAGE_NAME), page)?;
    Ok(())
}
