//! Prompt builders for the five generation stages.
//!
//! All prompts are Romanian-language editorial instructions. Stages 1-3 and
//! 5 demand strict JSON output; stage 4 embeds a complete HTML scaffold and
//! asks the model to fill it in. Builders are pure string functions so they
//! can be asserted on directly in tests.

use std::fmt::Write;

use serde_json::json;

use super::schema::{OutlineSection, Step4Request};

/// Outline compression caps applied before the research prompt.
const OUTLINE_MAX_ENTRIES: usize = 6;
const OUTLINE_MAX_CHARS: usize = 60;

/// Article prefix submitted for SEO scoring.
pub const SEO_HTML_PREFIX_CHARS: usize = 8000;

pub fn step1_prompt(initial_subject: &str) -> String {
    format!(
        "Ești un expert SEO și psihoterapeut. Generează 3 idei de subiecte detaliate pentru un \
         articol de blog care se bazează **direct și specific** pe \"{initial_subject}\" (NU \
         schimba subiectul principal, doar detaliază-l), optimizate SEO. Pentru fiecare idee, propune:\n\
         - Un cuvânt cheie principal relevant și cu volum de căutare decent.\n\
         - 5-7 cuvinte cheie secundare/LSI (variații, sinonime, termeni înrudiți semantic).\n\
         - 10 cuvinte cheie long-tail relevante cu intenția de căutare \
         (informațională/comercială/navigațională).\n\
         Alege cel mai bun subiect și set de cuvinte cheie din lista generată, justificând \
         alegerea, și returnează-le într-un format JSON strict, fără text suplimentar în afara \
         blocului JSON: {{\"subiect_final\": \"...\", \"cuvant_cheie_principal\": \"...\", \
         \"cuvinte_cheie_secundare_lsi\": [\"...\", \"...\"], \"cuvinte_cheie_long_tail\": \
         [\"...\", \"...\"], \"justificare_alegere\": \"...\"}}."
    )
}

pub fn step2_prompt(final_subject: &str, keywords: &str) -> String {
    format!(
        "Ești un strateg de conținut SEO. Pentru un articol de blog pe subiectul \
         \"{final_subject}\", cu setul de cuvinte cheie: {keywords}, realizează:\n\
         1. O scurtă analiză a lacunelor competitive: ce unghi unic poate diferenția acest \
         articol de conținutul existent pe acest subiect.\n\
         2. O structură completă de articol: 4-7 secțiuni H2, fiecare cu 2-4 subteme H3, \
         ordonate logic de la introducere la concluzie.\n\
         3. Un meta titlu (max 60 caractere) și o meta descriere (max 155 caractere) \
         optimizate pentru cuvântul cheie principal.\n\
         Returnează DOAR JSON strict, fără text suplimentar, cu schema: \
         {{\"structura_articol\": [{{\"titlu_h2\": \"...\", \"subteme_h3\": [\"...\"]}}], \
         \"unghi_unic\": \"...\", \"meta_titlu_propus\": \"...\", \
         \"meta_descriere_propusa\": \"...\"}}."
    )
}

/// Collapse the outline to a short list of section titles so the research
/// prompt (and its answer) stay small.
pub fn compress_outline(outline: &[OutlineSection]) -> Vec<String> {
    outline
        .iter()
        .map(|s| {
            s.titlu_h2
                .split_whitespace()
                .collect::<Vec<_>>()
                .join(" ")
                .chars()
                .take(OUTLINE_MAX_CHARS)
                .collect::<String>()
        })
        .filter(|s| !s.is_empty())
        .take(OUTLINE_MAX_ENTRIES)
        .collect()
}

pub fn step3_prompt(final_subject: &str, outline: &[OutlineSection]) -> String {
    let tiny_outline = compress_outline(outline);
    format!(
        "Generează STRICT JSON (fără markdown, fără explicații).\n\
         Cheile OBLIGATORII: \"expertInsights\", \"stats\", \"faq\".\n\
         Dacă nu găsești conținut valid, pune array gol [], nu omite cheia.\n\n\
         Limite stricte:\n\
         - expertInsights: MAX 2 itemi. Câmpuri: source (<=6 cuvinte), quote (<=18 cuvinte), \
         url (opțional).\n\
         - stats: MAX 3 itemi. Câmpuri: label (<=6 cuvinte), value (număr sau scurt șir), \
         source (<=4 cuvinte), url (opțional).\n\
         - faq: MAX 3 itemi. Câmpuri: q (<=10 cuvinte), a (<=18 cuvinte).\n\n\
         Subiect: {final_subject}\n\
         Outline (scurt): {}\n\n\
         Returnează DOAR obiectul JSON cu schema:\n\
         {{\n\
         \"expertInsights\":[{{\"source\":\"string\",\"quote\":\"string\",\"url\":\"string?\"}}],\n\
         \"stats\":[{{\"label\":\"string\",\"value\":\"string|number\",\"source\":\"string\",\"url\":\"string?\"}}],\n\
         \"faq\":[{{\"q\":\"string\",\"a\":\"string\"}}]\n\
         }}",
        json!(tiny_outline)
    )
}

const ARTICLE_STYLE: &str = r#"
        body { font-family: 'Arial', sans-serif; line-height: 1.7; color: #333; max-width: 800px; margin: 0 auto; padding: 20px; }
        h1, h2, h3 { font-weight: bold; color: #2c3e50; margin-top: 2em; margin-bottom: 0.8em; line-height: 1.2; }
        h1 { font-size: 2.2em; text-align: center; }
        h2 { font-size: 1.8em; color: #3498db; }
        h3 { font-size: 1.4em; }
        p { margin-bottom: 1em; text-align: justify; }
        ul, ol { margin-bottom: 1em; padding-left: 25px; }
        li { margin-bottom: 0.5em; }
        blockquote { border-left: 4px solid #ccc; padding-left: 15px; margin: 1.5em 0; font-style: italic; color: #555; }
        a { color: #3498db; text-decoration: none; }
        a:hover { text-decoration: underline; }
        .table-of-contents { background-color: #f9f9f9; padding: 15px; border-radius: 8px; border: 1px solid #eee; margin-bottom: 30px; }
        .table-of-contents a { font-weight: bold; }
        .highlight-box { background-color: #e6f7ff; border-left: 4px solid #3498db; padding: 15px; margin: 20px 0; border-radius: 4px; }
        .cta-block { background-color: #d4edda; color: #155724; padding: 25px; text-align: center; border-radius: 8px; margin-top: 40px; border: 1px solid #c3e6cb; }
        .cta-block a { background-color: #28a745; color: white; padding: 12px 25px; border-radius: 5px; display: inline-block; font-weight: bold; }
        @media (max-width: 768px) {
            body { margin: 10px; padding: 10px; }
            h1 { font-size: 1.8em; }
            h2 { font-size: 1.5em; }
        }
"#;

/// Stage-4 prompt: the complete HTML document scaffold with table of
/// contents, per-section writing instructions, expert citations, statistics
/// and resources interpolated from the prior stage results.
pub fn step4_prompt(req: &Step4Request) -> String {
    let subject = &req.final_subject;
    let step1 = &req.step1_result;
    let step2 = &req.step2_result;
    let step3 = &req.step3_result;
    let secondary_keywords = step1.cuvinte_cheie_secundare_lsi.join(", ");

    let mut toc = String::new();
    for (index, section) in step2.structura_articol.iter().enumerate() {
        let section_id = format!("section-{}", index + 1);
        let _ = write!(
            toc,
            "<li><a href=\"#{section_id}\">{}</a>",
            section.titlu_h2
        );
        if !section.subteme_h3.is_empty() {
            toc.push_str("<ul>");
            for (sub_index, subtheme) in section.subteme_h3.iter().enumerate() {
                let _ = write!(
                    toc,
                    "<li><a href=\"#{section_id}-{}\">{subtheme}</a></li>",
                    sub_index + 1
                );
            }
            toc.push_str("</ul>");
        }
        toc.push_str("</li>");
    }

    let mut sections = String::new();
    for (index, section) in step2.structura_articol.iter().enumerate() {
        let _ = write!(
            sections,
            "<h2 id=\"section-{}\">{}</h2>\n\
             <p>Dezvoltă această secțiune cu 1-3 paragrafe esențiale și concise, oferind \
             informații practice și validate științific. Integrează natural cuvintele cheie \
             secundare relevante pentru această secțiune: {secondary_keywords}. Include, dacă \
             este cazul, o listă cu bullet points sau numerotată.</p>\n",
            index + 1,
            section.titlu_h2
        );
        if !section.subteme_h3.is_empty() {
            let _ = write!(sections, "<p><strong>{}</strong></p>\n", section.subteme_h3.join(", "));
        }
    }

    let mut insights = String::new();
    for insight in &step3.expert_insights {
        let _ = write!(
            insights,
            "<blockquote><p><strong>{}</strong>: \"{}\"</p></blockquote>\n",
            insight.source, insight.quote
        );
    }

    let stats_line = step3
        .stats
        .iter()
        .map(|s| {
            let value = match &s.value {
                serde_json::Value::String(v) => v.clone(),
                other => other.to_string(),
            };
            format!("{}: {} ({})", s.label, value, s.source)
        })
        .collect::<Vec<_>>()
        .join("; ");

    let mut faq_items = String::new();
    for entry in &step3.faq {
        let _ = write!(
            faq_items,
            "<h3>{}</h3>\n<p>{}</p>\n",
            entry.q, entry.a
        );
    }

    format!(
        "Ești un expert în crearea de conținut SEO și psihoterapeut. Redactează un articol de \
         blog complet de **aproximativ 1200-1500 de cuvinte**, pe subiectul \"{subject}\".\n\
         FORMATUL DE IEȘIRE TREBUIE SĂ FIE DOAR HTML VALID, CURAT ȘI GATA DE COPY-PASTE \
         ÎNTR-UN SITE, FĂRĂ TEXT SUPLIMENTAR SAU MARKDOWN ÎN AFARA HTML-ului.\n\
         Articolul trebuie să respecte următoarea structură:\n\n\
         <!DOCTYPE html>\n\
         <html lang=\"ro\">\n\
         <head>\n\
         <meta charset=\"UTF-8\">\n\
         <meta name=\"viewport\" content=\"width=device-width, initial-scale=1.0\">\n\
         <title>{meta_title}</title>\n\
         <meta name=\"description\" content=\"{meta_description}\">\n\
         <style>{style}</style>\n\
         </head>\n\
         <body>\n\
         <div class=\"table-of-contents\">\n\
         <h2 style=\"margin-top: 0;\">Cuprins:</h2>\n\
         <ul style=\"list-style-type: none; padding: 0;\">{toc}</ul>\n\
         </div>\n\n\
         <h1>{subject}</h1>\n\n\
         <p><strong>Introducere:</strong> Creează o introducere captivantă de 2-3 paragrafe \
         care explică pe scurt ce este \"{subject}\", de ce este importantă pentru cititor și \
         ce va învăța din articol. Integrează cuvântul cheie principal \"{main_keyword}\" \
         natural în text. Folosește un ton primitor, empatic și profesional. Unghiul \
         editorial al articolului: {angle}.</p>\n\n\
         {sections}\n\
         <h2>Perspective din Psihoterapie: Ce Spun Experții</h2>\n\
         <p>Domeniul psihoterapiei oferă fundamentele științifice pentru înțelegerea \
         subiectului \"{subject}\". Iată ce ne învață cercetătorii:</p>\n\
         {insights}\n\
         <p>Statisticile relevante din domeniu ({stats_line}) arată că provocările psihologice \
         sunt comune și subliniază necesitatea abordărilor validate științific.</p>\n\n\
         <h2>Întrebări Frecvente</h2>\n\
         {faq_items}\n\
         <h2>Resurse Suplimentare</h2>\n\
         <ul>\n\
         <li>Informații validate despre sănătatea mintală: <a href=\"https://www.who.int/health-topics/mental-health\" rel=\"nofollow\">Organizația Mondială a Sănătății (OMS)</a></li>\n\
         <li>Psihoterapeuți acreditați: <a href=\"https://www.copsi.ro\" rel=\"nofollow\">Colegiul Psihologilor din România</a></li>\n\
         <li>Studii științifice: <a href=\"https://scholar.google.com/\" rel=\"nofollow\">Google Scholar</a></li>\n\
         <li>Publicații de specialitate: <a href=\"https://pubmed.ncbi.nlm.nih.gov/\" rel=\"nofollow\">PubMed</a></li>\n\
         </ul>\n\n\
         <h2>Concluzie: O Călătorie Spre Binele Tău</h2>\n\
         <p>Rezumă principalele beneficii ale gestionării subiectului \"{subject}\" și \
         încurajează cititorul să ia măsuri concrete. Subliniază importanța sprijinului \
         profesional și a perseverenței.</p>\n\n\
         <div class=\"cta-block\">\n\
         <h2>Ești pregătit să faci primul pas?</h2>\n\
         <p>Dacă simți că acest articol a rezonat cu tine și ai nevoie de sprijin \
         specializat, nu ești singur/ă. Este un act de curaj să ceri ajutor.</p>\n\
         <a href=\"#contact\">Programează o ședință acum!</a>\n\
         </div>\n\
         </body>\n\
         </html>",
        meta_title = step2.meta_titlu_propus,
        meta_description = step2.meta_descriere_propusa,
        style = ARTICLE_STYLE,
        main_keyword = step1.cuvant_cheie_principal,
        angle = step2.unghi_unic,
    )
}

pub fn step5_prompt(html_article: &str, keywords: &str) -> String {
    let prefix: String = html_article.chars().take(SEO_HTML_PREFIX_CHARS).collect();
    format!(
        "Evaluează următorul articol HTML pentru SEO și calitate UX:\n\n\
         CRITERII DE EVALUARE:\n\
         1. **Cuvinte cheie**: Densitate și distribuție pentru: \"{keywords}\"\n\
         2. **Structură HTML**: Ierarhia H1 > H2 > H3 (și H4 dacă există) și semantica.\n\
         3. **Calitatea conținutului**: Originalitate, valoare, coerență.\n\
         4. **Meta date**: Title și meta description.\n\
         5. **UX**: Lizibilitate, structură, CTA-uri.\n\n\
         Returnează DOAR JSON strict:\n\
         {{\n\
         \"scor_general\": 85,\n\
         \"analiza_detaliata\": {{\n\
         \"cuvinte_cheie\": {{\"scor\": 90, \"comentarii\": \"Densitate optimă...\"}},\n\
         \"structura_html\": {{\"scor\": 80, \"comentarii\": \"Ierarhie corectă...\"}},\n\
         \"calitate_continut\": {{\"scor\": 85, \"comentarii\": \"Conținut valoros...\"}},\n\
         \"meta_date\": {{\"scor\": 75, \"comentarii\": \"Title și description OK...\"}},\n\
         \"ux_lizibilitate\": {{\"scor\": 90, \"comentarii\": \"Structură clară...\"}}\n\
         }},\n\
         \"recomandari_prioritare\": [\"Îmbunătățire 1\", \"Îmbunătățire 2\", \"Îmbunătățire 3\"],\n\
         \"status_seo\": \"Bun\"\n\
         }}\n\n\
         Articol HTML:\n{prefix}..."
    )
}
