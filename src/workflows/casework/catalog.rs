use std::fmt;

use serde::{Deserialize, Serialize};

use super::mapping::StageMap;

/// Identifies which stage vocabulary a case is tracked against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CatalogVariant {
    /// Extended vocabulary used by the technical teams (9 stages).
    Operational,
    /// Simplified vocabulary shown on the public progress board (7 stages).
    Visual,
}

impl CatalogVariant {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Operational => "operational",
            Self::Visual => "visual",
        }
    }
}

impl fmt::Display for CatalogVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One stage of a catalog, loaded at process start and never mutated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageDefinition {
    pub code: String,
    pub order: u32,
    pub title: String,
    pub description: String,
    pub default_sla_days: i64,
    /// Whether advancing into this stage must be confirmed by a second actor.
    pub requires_validation: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CatalogError {
    #[error("stage {code} is not part of the {variant} catalog")]
    UnknownStage { variant: CatalogVariant, code: String },
    #[error("{variant} catalog declares no stages")]
    EmptyCatalog { variant: CatalogVariant },
    #[error("{variant} catalog declares stage {code} more than once")]
    DuplicateStage { variant: CatalogVariant, code: String },
    #[error("{variant} catalog stage {code} has order {found}, expected {expected}")]
    NonContiguousOrder {
        variant: CatalogVariant,
        code: String,
        expected: u32,
        found: u32,
    },
}

/// Ordered stage vocabulary for one workflow variant.
///
/// Construction validates the catalog invariants: at least one stage, unique
/// codes, and orders that run contiguously from 1. Lookup failures after that
/// point mean a caller referenced a stage the configuration never declared.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageCatalog {
    variant: CatalogVariant,
    stages: Vec<StageDefinition>,
}

impl StageCatalog {
    pub fn new(
        variant: CatalogVariant,
        stages: Vec<StageDefinition>,
    ) -> Result<Self, CatalogError> {
        if stages.is_empty() {
            return Err(CatalogError::EmptyCatalog { variant });
        }

        for (index, stage) in stages.iter().enumerate() {
            let expected = index as u32 + 1;
            if stage.order != expected {
                return Err(CatalogError::NonContiguousOrder {
                    variant,
                    code: stage.code.clone(),
                    expected,
                    found: stage.order,
                });
            }
            if stages[..index].iter().any(|seen| seen.code == stage.code) {
                return Err(CatalogError::DuplicateStage {
                    variant,
                    code: stage.code.clone(),
                });
            }
        }

        Ok(Self { variant, stages })
    }

    pub fn variant(&self) -> CatalogVariant {
        self.variant
    }

    pub fn stages(&self) -> &[StageDefinition] {
        &self.stages
    }

    pub fn first(&self) -> &StageDefinition {
        &self.stages[0]
    }

    pub fn stage_at(&self, code: &str) -> Result<&StageDefinition, CatalogError> {
        self.stages
            .iter()
            .find(|stage| stage.code == code)
            .ok_or_else(|| CatalogError::UnknownStage {
                variant: self.variant,
                code: code.to_owned(),
            })
    }

    pub fn order_of(&self, code: &str) -> Result<u32, CatalogError> {
        self.stage_at(code).map(|stage| stage.order)
    }

    /// The stage following `code`, or `None` when `code` is the last stage.
    pub fn next(&self, code: &str) -> Result<Option<&StageDefinition>, CatalogError> {
        let order = self.order_of(code)?;
        Ok(self.stages.get(order as usize))
    }
}

/// Immutable bundle of both catalogs plus the display mapping between them.
///
/// Loaded once at process start. Reloading catalog configuration means
/// constructing a new set with a bumped `version`; nothing mutates a live set.
#[derive(Debug, Clone)]
pub struct CatalogSet {
    version: u32,
    operational: StageCatalog,
    visual: StageCatalog,
    mapping: StageMap,
}

impl CatalogSet {
    pub fn new(
        version: u32,
        operational: StageCatalog,
        visual: StageCatalog,
        mapping: StageMap,
    ) -> Self {
        Self {
            version,
            operational,
            visual,
            mapping,
        }
    }

    /// The stage configuration shipped with the municipal deployment.
    pub fn builtin() -> Self {
        let operational = StageCatalog::new(CatalogVariant::Operational, operational_stages())
            .expect("builtin operational catalog is valid");
        let visual = StageCatalog::new(CatalogVariant::Visual, visual_stages())
            .expect("builtin visual catalog is valid");
        let mapping = StageMap::new(
            BUILTIN_DISPLAY_MAP
                .iter()
                .map(|(extended, simplified)| (extended.to_string(), simplified.to_string())),
            visual.first().code.clone(),
        );

        Self::new(1, operational, visual, mapping)
    }

    pub fn version(&self) -> u32 {
        self.version
    }

    pub fn catalog(&self, variant: CatalogVariant) -> &StageCatalog {
        match variant {
            CatalogVariant::Operational => &self.operational,
            CatalogVariant::Visual => &self.visual,
        }
    }

    pub fn operational(&self) -> &StageCatalog {
        &self.operational
    }

    pub fn visual(&self) -> &StageCatalog {
        &self.visual
    }

    pub fn mapping(&self) -> &StageMap {
        &self.mapping
    }
}

/// Extended-to-simplified stage pairs. Many extended codes collapse onto one
/// visual stage; the first pair for each visual code doubles as its
/// representative for the best-effort inverse.
const BUILTIN_DISPLAY_MAP: [(&str, &str); 9] = [
    ("RECEPCAO", "ACOLHIDA"),
    ("TRIAGEM", "TRIAGEM"),
    ("CADASTRO", "TRIAGEM"),
    ("DIAGNOSTICO", "DIAGNOSTICO"),
    ("PLANO", "PLANO"),
    ("ENCAMINHAMENTO", "EXECUCAO"),
    ("ACOMPANHAMENTO", "MONITORAMENTO"),
    ("AVALIACAO", "MONITORAMENTO"),
    ("DESLIGAMENTO", "CONCLUSAO"),
];

fn stage(
    code: &str,
    order: u32,
    title: &str,
    description: &str,
    default_sla_days: i64,
    requires_validation: bool,
) -> StageDefinition {
    StageDefinition {
        code: code.to_string(),
        order,
        title: title.to_string(),
        description: description.to_string(),
        default_sla_days,
        requires_validation,
    }
}

fn operational_stages() -> Vec<StageDefinition> {
    vec![
        stage(
            "RECEPCAO",
            1,
            "Recepção",
            "Registro do primeiro contato da família com a unidade.",
            1,
            false,
        ),
        stage(
            "TRIAGEM",
            2,
            "Triagem",
            "Classificação inicial da demanda e verificação de urgência.",
            2,
            false,
        ),
        stage(
            "CADASTRO",
            3,
            "Cadastro",
            "Inclusão ou atualização da família no cadastro municipal.",
            3,
            false,
        ),
        stage(
            "DIAGNOSTICO",
            4,
            "Diagnóstico socioassistencial",
            "Estudo aprofundado da situação familiar conduzido pela equipe técnica.",
            15,
            true,
        ),
        stage(
            "PLANO",
            5,
            "Plano de acompanhamento",
            "Pactuação do plano de acompanhamento com a família.",
            10,
            false,
        ),
        stage(
            "ENCAMINHAMENTO",
            6,
            "Encaminhamento à rede",
            "Encaminhamento para os serviços da rede socioassistencial.",
            7,
            false,
        ),
        stage(
            "ACOMPANHAMENTO",
            7,
            "Acompanhamento",
            "Acompanhamento continuado da família pela equipe de referência.",
            30,
            false,
        ),
        stage(
            "AVALIACAO",
            8,
            "Avaliação de resultados",
            "Avaliação dos resultados alcançados durante o acompanhamento.",
            10,
            true,
        ),
        stage(
            "DESLIGAMENTO",
            9,
            "Desligamento",
            "Encerramento qualificado do acompanhamento.",
            5,
            false,
        ),
    ]
}

fn visual_stages() -> Vec<StageDefinition> {
    vec![
        stage(
            "ACOLHIDA",
            1,
            "Acolhida",
            "Chegada da família ao serviço.",
            2,
            false,
        ),
        stage(
            "TRIAGEM",
            2,
            "Triagem",
            "Classificação da demanda.",
            2,
            false,
        ),
        stage(
            "DIAGNOSTICO",
            3,
            "Diagnóstico",
            "Estudo da situação familiar.",
            15,
            false,
        ),
        stage(
            "PLANO",
            4,
            "Plano",
            "Plano de acompanhamento pactuado.",
            10,
            false,
        ),
        stage(
            "EXECUCAO",
            5,
            "Execução",
            "Ações e encaminhamentos em andamento.",
            20,
            false,
        ),
        stage(
            "MONITORAMENTO",
            6,
            "Monitoramento",
            "Acompanhamento dos resultados.",
            30,
            false,
        ),
        stage(
            "CONCLUSAO",
            7,
            "Conclusão",
            "Encerramento do caso.",
            5,
            false,
        ),
    ]
}
