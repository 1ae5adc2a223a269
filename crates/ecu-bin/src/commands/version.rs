// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! `ecu version`

use crate::cli::Cli;
use crate::error::BinResult;

pub fn version(_cli: &Cli) -> BinResult<()> {
    print!("{}", version_text());
    Ok(())
}

fn version_text() -> String {
    format!(
        "ecu {bin} (ecu-modbus {modbus}, ecu-config {config})\n\
         transports: modbus-tcp, modbus-rtu\n\
         platform:   {os}/{arch}\n",
        bin = crate::VERSION,
        modbus = ecu_modbus::VERSION,
        config = ecu_config::VERSION,
        os = std::env::consts::OS,
        arch = std::env::consts::ARCH,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_text_names_every_crate() {
        let text = version_text();
        assert!(text.starts_with(&format!("ecu {}", crate::VERSION)));
        assert!(text.contains("ecu-modbus"));
        assert!(text.contains("ecu-config"));
        assert_eq!(text.lines().count(), 3);
    }
}
