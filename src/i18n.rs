use serde::{Deserialize, Serialize};

/// 规划摘要的目标语言
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Default)]
pub enum TargetLanguage {
    #[serde(rename = "es")]
    #[default]
    Spanish,
    #[serde(rename = "en")]
    English,
    #[serde(rename = "pt")]
    Portuguese,
    #[serde(rename = "fr")]
    French,
    #[serde(rename = "zh")]
    Chinese,
}

impl std::fmt::Display for TargetLanguage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TargetLanguage::Spanish => write!(f, "es"),
            TargetLanguage::English => write!(f, "en"),
            TargetLanguage::Portuguese => write!(f, "pt"),
            TargetLanguage::French => write!(f, "fr"),
            TargetLanguage::Chinese => write!(f, "zh"),
        }
    }
}

impl std::str::FromStr for TargetLanguage {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "es" | "spanish" | "español" => Ok(TargetLanguage::Spanish),
            "en" | "english" => Ok(TargetLanguage::English),
            "pt" | "portuguese" | "português" => Ok(TargetLanguage::Portuguese),
            "fr" | "french" | "français" => Ok(TargetLanguage::French),
            "zh" | "chinese" | "中文" => Ok(TargetLanguage::Chinese),
            _ => Err(format!("Unknown target language: {}", s)),
        }
    }
}

impl TargetLanguage {
    /// 获取语言的描述性名称
    pub fn display_name(&self) -> &'static str {
        match self {
            TargetLanguage::Spanish => "Español",
            TargetLanguage::English => "English",
            TargetLanguage::Portuguese => "Português",
            TargetLanguage::French => "Français",
            TargetLanguage::Chinese => "中文",
        }
    }

    /// 获取摘要提示词中的语言指令
    pub fn prompt_instruction(&self) -> &'static str {
        match self {
            TargetLanguage::Spanish => {
                "Redacta la respuesta en español, con un lenguaje claro y técnico dirigido a equipos de planeación urbana."
            }
            TargetLanguage::English => {
                "Write the answer in English, using clear technical language aimed at urban planning teams."
            }
            TargetLanguage::Portuguese => {
                "Escreva a resposta em português, com linguagem clara e técnica voltada para equipes de planejamento urbano."
            }
            TargetLanguage::French => {
                "Rédigez la réponse en français, dans un langage clair et technique destiné aux équipes d'urbanisme."
            }
            TargetLanguage::Chinese => "请使用中文作答，语言清晰、专业，面向城市规划团队。",
        }
    }
}
