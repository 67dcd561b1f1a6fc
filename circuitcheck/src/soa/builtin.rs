//! Built-in limit patterns for common discrete semiconductors.
//!
//! Covers the absolute-maximum ratings that matter for SOA checking on
//! MOSFETs, diodes and BJTs. Priorities are spaced by 10 so user patterns
//! can slot in between.

use super::pattern::LimitPattern;

/// Section headings that mark pages worth scanning first.
pub fn section_keywords() -> Vec<&'static str> {
    vec![
        "Absolute Maximum Ratings",
        "Safe Operating Area",
        "Maximum Ratings",
        "Electrical Characteristics",
        "Limiting Values",
        "Absolute Maximum",
        "Maximum Operating",
        "Peak Ratings",
    ]
}

/// The default pattern set, in priority order.
pub fn builtin_patterns() -> Vec<LimitPattern> {
    vec![
        LimitPattern::new(
            "Vds_max",
            vec!["Vds", "Drain-Source Voltage", "Drain Source Voltage"],
            "V",
            "Maximum drain-source voltage",
        )
        .with_priority(10),
        LimitPattern::new(
            "Id_max",
            vec!["Id", "Drain Current"],
            "A",
            "Maximum continuous drain current",
        )
        .with_priority(20),
        LimitPattern::new(
            "Pd_max",
            vec!["Pd", "PD", "Power Dissipation"],
            "W",
            "Maximum power dissipation",
        )
        .with_priority(30),
        LimitPattern::new(
            "Vr_max",
            vec!["Vr", "Reverse Voltage"],
            "V",
            "Maximum reverse voltage",
        )
        .with_priority(40),
        LimitPattern::new(
            "If_max",
            vec!["If", "Forward Current"],
            "A",
            "Maximum forward current",
        )
        .with_priority(50),
        LimitPattern::new(
            "Vce_max",
            vec!["Vce", "Collector-Emitter Voltage", "Collector Emitter Voltage"],
            "V",
            "Maximum collector-emitter voltage",
        )
        .with_priority(60),
        LimitPattern::new(
            "Ic_max",
            vec!["Ic", "Collector Current"],
            "A",
            "Maximum collector current",
        )
        .with_priority(70),
        LimitPattern::new(
            "Vbe_max",
            vec!["Vbe", "Base-Emitter Voltage", "Base Emitter Voltage"],
            "V",
            "Maximum base-emitter voltage",
        )
        .with_priority(80),
        LimitPattern::new(
            "Ib_max",
            vec!["Ib", "Base Current"],
            "A",
            "Maximum base current",
        )
        .with_priority(90),
    ]
}
