use std::path::Path;

pub(crate) fn tx(time_ns: i64, uid: u64) -> String {
    format!("Tx Time: +{time_ns}.0ns Pkt UId *{uid}& Payload (size=1472)")
}

pub(crate) fn rx(time_ns: i64, uid: u64) -> String {
    format!("Rx Time: +{time_ns}.0ns Pkt UId *{uid}& Payload (size=1472)")
}

pub(crate) fn write_trace(path: &Path, lines: &[String]) -> std::io::Result<()> {
    let contents = lines.iter().map(|l| format!("{l}\n")).collect::<String>();
    std::fs::write(path, contents)
}
