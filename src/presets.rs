/// Built-in business/location setups and the default keyword list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Preset {
    pub key: &'static str,
    pub location_name: &'static str,
    pub location: &'static str,
    pub business_names: &'static [&'static str],
}

impl Preset {
    pub fn business_name(&self) -> &'static str {
        self.business_names[0]
    }

    pub fn target_names(&self) -> Vec<String> {
        self.business_names.iter().map(|n| n.to_string()).collect()
    }
}

pub const DEFAULT_KEYWORDS: [&str; 18] = [
    "PCOD Treatment",
    "Female Gynaecologist",
    "IVF Treatment",
    "Best Gynaecologist",
    "Infertility Treatment",
    "High-Risk Pregnancy",
    "Endometriosis specialist",
    "Hormone Replacement Therapy",
    "Endometriosis Treatment",
    "Obstetrician-gynecologist",
    "Ovarian Cyst Treatment",
    "PCOS Treatment",
    "Menopause Treatment",
    "Menstrual Disorders Treatment",
    "Gynecological Infection Treatment",
    "Menorrhagia Treatment",
    "Women's Health Clinic",
    "Uterine Prolapse Treatment",
];

pub static PRESETS: [Preset; 3] = [
    Preset {
        key: "malad",
        location_name: "Malad",
        location: "Malad, Mumbai",
        business_names: &[
            "Dr. Prashansa Raut Dalvi",
            "Dr Prashansa Raut",
            "Prashansa Raut Dalvi",
        ],
    },
    Preset {
        key: "andheri",
        location_name: "Andheri",
        location: "Andheri, Mumbai",
        business_names: &[
            "Dr. Prashansa Raut-Dalvi",
            "Dr Prashansa Raut Andheri",
            "Prashansa Raut-Dalvi",
        ],
    },
    Preset {
        key: "palghar",
        location_name: "Palghar",
        location: "Palghar",
        business_names: &[
            "Dr Prashansa Raut-Dalvi",
            "Dr Prashansa Raut",
            "Dr. Prashansa Raut",
            "Prashansa Raut",
            "Dr. Prashansa Raut Palghar",
            "Prashansa Raut Gynaecologist",
        ],
    },
];

/// The same locations as searched together by "all". Each one accepts a
/// shorter list of spellings than its single-location preset.
pub static MULTI_PRESETS: [Preset; 3] = [
    Preset {
        key: "malad",
        location_name: "Malad",
        location: "Malad, Mumbai",
        business_names: &[
            "Dr. Prashansa Raut Dalvi",
            "Dr Prashansa Raut",
            "Prashansa Raut Dalvi",
        ],
    },
    Preset {
        key: "andheri",
        location_name: "Andheri",
        location: "Andheri, Mumbai",
        business_names: &[
            "Dr. Prashansa Raut-Dalvi",
            "Dr Prashansa Raut Andheri",
            "Prashansa Raut-Dalvi",
        ],
    },
    Preset {
        key: "palghar",
        location_name: "Palghar",
        location: "Palghar",
        business_names: &[
            "Dr Prashansa Raut-Dalvi",
            "Dr. Prashansa Raut Palghar",
            "Prashansa Raut Gynaecologist",
        ],
    },
];

pub fn preset(key: &str) -> Option<&'static Preset> {
    PRESETS.iter().find(|p| p.key.eq_ignore_ascii_case(key))
}

/// Presets selected by `key`; "all" selects every location with its
/// multi-location spellings.
pub fn select(key: &str) -> Vec<&'static Preset> {
    if key.trim().eq_ignore_ascii_case("all") {
        return MULTI_PRESETS.iter().collect();
    }
    preset(key).into_iter().collect()
}

/// Maps the numbered menu choices "1".."4" to preset keys. "5" is the custom setup.
pub fn choice_key(choice: &str) -> Option<&'static str> {
    match choice.trim() {
        "1" => Some("malad"),
        "2" => Some("andheri"),
        "3" => Some("palghar"),
        "4" => Some("all"),
        _ => None,
    }
}

pub fn default_keywords() -> Vec<String> {
    DEFAULT_KEYWORDS.iter().map(|k| k.to_string()).collect()
}
