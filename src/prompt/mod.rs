//! Prompt Assembler
//!
//! Renders the fixed research prompt handed to an external AI assistant. The
//! template never changes between calls; only the context fields, the
//! generation date and the OCR block are interpolated. Everything that needs
//! research is left as instructions for the assistant.

use chrono::NaiveDate;
use serde::Serialize;

/// Required free-text fields of a submission
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ContextFields {
    /// Season label, e.g. "2024-2025"
    pub season: String,
    /// League code, e.g. "HOL"
    pub league: String,
    /// Country name, e.g. "Holanda"
    pub country: String,
}

/// The final prompt and the values it was built from
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RenderedPrompt {
    pub text: String,
    pub league: String,
    pub season: String,
    pub country: String,
    pub generated_on: NaiveDate,
}

pub const DATE_FORMAT: &str = "%d/%m/%Y";

/// Skeleton section headers, each present exactly once in a rendered prompt
pub const SKELETON_HEADERS: [&str; 4] = [
    "# DOSSIÊ DE INTELIGÊNCIA",
    "## PARTE 1: ACHADOS HISTÓRICOS",
    "## PARTE 2: ANÁLISE DOS DADOS DA TEMPORADA",
    "## VEREDITO FINAL",
];

/// Build the [`RenderedPrompt`] for a validated submission
pub fn assemble(fields: &ContextFields, today: NaiveDate, ocr_block: &str) -> RenderedPrompt {
    RenderedPrompt {
        text: render_prompt(fields, today, ocr_block),
        league: fields.league.clone(),
        season: fields.season.clone(),
        country: fields.country.clone(),
        generated_on: today,
    }
}

/// Interpolate the values into the template in a single formatting pass
pub fn render_prompt(fields: &ContextFields, today: NaiveDate, ocr_block: &str) -> String {
    format!(
        r#"Você é um analista de futebol sênior, especialista em ligas europeias, estatística aplicada e identificação de padrões históricos. Seu trabalho é produzir dossiês objetivos, verificáveis e orientados a dados.

### CONTEXTO
- Liga para Análise: {league}
- País: {country}
- Temporada: {season}
- Data de Geração: {date}

### TAREFAS (execute na ordem)

1. Pesquisa autônoma: pesquise por conta própria o histórico recente da liga {league} ({country}) nas temporadas anteriores a {season}. Identifique campeões, rebaixados, surpresas, médias de gols e padrões de desempenho em casa e fora. Cite a fonte de cada achado.

2. Dados da temporada atual: use exclusivamente o bloco de texto extraído por OCR abaixo, que contém a tabela de classificação e as estatísticas da temporada {season}. O texto pode conter ruído de reconhecimento; corrija nomes de times evidentes, mas não invente números.

3. Consolidação: combine os achados das tarefas 1 e 2 e preencha o modelo de saída abaixo, mantendo exatamente a estrutura e os títulos de seção.

### DADOS EXTRAÍDOS (OCR)
{ocr_block}
### MODELO DE SAÍDA

# DOSSIÊ DE INTELIGÊNCIA
**Liga:** {league}
**Temporada:** {season}
**Gerado em:** {date}

## PARTE 1: ACHADOS HISTÓRICOS
[Preencher com os resultados da pesquisa autônoma da tarefa 1.]

## PARTE 2: ANÁLISE DOS DADOS DA TEMPORADA
[Preencher com a análise do bloco de dados extraídos da tarefa 2.]

## VEREDITO FINAL
Ranking dos times com maior potencial para a sequência da temporada:
1. [Time]
2. [Time]
3. [Time]
4. [Time]
5. [Time]
"#,
        league = fields.league,
        country = fields.country,
        season = fields.season,
        date = today.format(DATE_FORMAT),
        ocr_block = ocr_block,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fields() -> ContextFields {
        ContextFields {
            season: "2024-2025".to_string(),
            league: "HOL".to_string(),
            country: "Holanda".to_string(),
        }
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, 7).unwrap()
    }

    #[test]
    fn test_context_is_interpolated() {
        let text = render_prompt(&fields(), today(), "TABLE_A\n");

        assert!(text.contains("Liga para Análise: HOL"));
        assert!(text.contains("Temporada: 2024-2025"));
        assert!(text.contains("País: Holanda"));
        assert!(text.contains("Data de Geração: 07/03/2025"));
        assert!(text.contains("TABLE_A"));
    }

    #[test]
    fn test_skeleton_headers_appear_once() {
        let text = render_prompt(&fields(), today(), "");

        for header in SKELETON_HEADERS {
            assert_eq!(text.matches(header).count(), 1, "header {header}");
        }
    }

    #[test]
    fn test_template_is_static() {
        let a = render_prompt(&fields(), today(), "X");
        let b = render_prompt(&fields(), today(), "X");
        assert_eq!(a, b);
    }

    #[test]
    fn test_braces_in_input_are_not_expanded() {
        let mut fields = fields();
        fields.country = "{league}".to_string();

        let text = render_prompt(&fields, today(), "{season}");

        assert!(text.contains("País: {league}"));
        assert!(text.contains("{season}"));
    }

    #[test]
    fn test_assemble_keeps_metadata() {
        let prompt = assemble(&fields(), today(), "");

        assert_eq!(prompt.league, "HOL");
        assert_eq!(prompt.generated_on, today());
        assert!(prompt.text.starts_with("Você é um analista"));
    }
}
