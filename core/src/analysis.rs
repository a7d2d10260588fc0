use lazy_static::lazy_static;
use regex::Regex;
use rust_stemmers::{Algorithm, Stemmer};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

use crate::Term;

lazy_static! {
    static ref WORD: Regex = Regex::new(r"(?u)[\p{L}\p{N}][\p{L}\p{M}\p{N}_']*").expect("valid regex");
    static ref ENGLISH_STOPWORDS: HashSet<&'static str> = {
        let words: &[&str] = &[
            "a","about","above","after","again","against","all","am","an","and","any","are","aren't","as","at",
            "be","because","been","before","being","below","between","both","but","by",
            "can","can't","cannot","could","couldn't",
            "did","didn't","do","does","doesn't","doing","don't","down","during",
            "each","few","for","from","further",
            "had","hadn't","has","hasn't","have","haven't","having","he","he'd","he'll","he's","her","here","here's","hers","herself","him","himself","his","how","how's",
            "i","i'd","i'll","i'm","i've","if","in","into","is","isn't","it","it's","its","itself",
            "let's","me","more","most","mustn't","my","myself",
            "no","nor","not","of","off","on","once","only","or","other","ought","our","ours","ourselves","out","over","own",
            "same","she","she'd","she'll","she's","should","shouldn't","so","some","such",
            "than","that","that's","the","their","theirs","them","themselves","then","there","there's","these","they","they'd","they'll","they're","they've","this","those","through","to","too",
            "under","until","up","very",
            "was","wasn't","we","we'd","we'll","we're","we've","were","weren't","what","what's","when","when's","where","where's","which","while","who","who's","whom","why","why's","with","won't","would","wouldn't",
            "you","you'd","you'll","you're","you've","your","yours","yourself","yourselves"
        ];
        words.iter().copied().collect()
    };
    // Cedilla spellings; comma-below input is mapped onto these before lookup.
    static ref ROMANIAN_STOPWORDS: HashSet<&'static str> = {
        let words: &[&str] = &[
            "a","abia","acea","aceasta","această","aceea","aceeaşi","acei","aceia","acel","acela","acelaşi","acele","acelea",
            "acest","acesta","aceste","acestea","acestei","aceşti","aceştia","acestui","acolo","acum","ai","aia","aibă","aici",
            "al","ăla","ale","alea","ălea","altceva","altcineva","am","ar","are","aş","aşadar","asemenea","asta","ăsta",
            "astăzi","astea","ăstea","ăştia","asupra","aţi","au","avea","avem","aveţi","azi",
            "bine","bună","ca","că","căci","când","care","cărei","căror","cărui","cât","câte","câţi","către","câtva",
            "ce","cel","ceva","chiar","cine","cineva","contra","cu","cum","cumva","curând",
            "da","dă","dacă","dar","datorită","de","deci","deja","deoarece","departe","deşi","din","dinaintea","dintr",
            "dintre","drept","după","ea","ei","el","ele","eram","este","eşti","eu",
            "face","fără","fi","fie","fiecare","fii","fim","fiţi","iar","ieri","îi","îl","îmi","împotriva","în",
            "înainte","înaintea","încât","încotro","între","întrucât","îţi",
            "la","lângă","le","li","lor","lui","mă","mâine","mea","mei","mele","mereu","meu","mi","mine","mult",
            "multă","mulţi","ne","nicăieri","nici","nimeni","nişte","noastră","noastre","noi","noştri","nostru","nu",
            "ori","oricând","oricare","oricât","orice","oricine","oricum","oriunde",
            "până","pe","pentru","peste","poate","pot","prea","prima","primul","prin","printr",
            "sa","să","săi","sale","sau","său","se","şi","spre","sub","sunt","suntem","sunteţi",
            "ta","tăi","tale","tău","te","ţi","ţie","tine","toată","toate","tot","toţi","totuşi","tu",
            "un","una","unde","undeva","unei","unele","uneori","unor","vă","vi","voastră","voastre","voi",
            "voştri","vostru","vouă","vreo","vreun"
        ];
        words.iter().copied().collect()
    };
}

/// Language profile driving stop-word removal and stemming.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    None,
    English,
    Romanian,
}

impl Language {
    fn stopwords(self) -> Option<&'static HashSet<&'static str>> {
        match self {
            Language::None => None,
            Language::English => Some(&*ENGLISH_STOPWORDS),
            Language::Romanian => Some(&*ROMANIAN_STOPWORDS),
        }
    }

    fn algorithm(self) -> Option<Algorithm> {
        match self {
            Language::None => None,
            Language::English => Some(Algorithm::English),
            Language::Romanian => Some(Algorithm::Romanian),
        }
    }

    /// Maps spelling variants onto one canonical form before filtering.
    fn canonicalize(self, token: &str) -> String {
        match self {
            Language::Romanian => token
                .chars()
                .map(|c| match c {
                    'ș' => 'ş',
                    'Ș' => 'Ş',
                    'ț' => 'ţ',
                    'Ț' => 'Ţ',
                    other => other,
                })
                .collect(),
            _ => token.to_string(),
        }
    }
}

impl FromStr for Language {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "none" => Ok(Language::None),
            "en" | "english" => Ok(Language::English),
            "ro" | "romanian" => Ok(Language::Romanian),
            other => Err(format!("unknown language profile `{other}`")),
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Language::None => "none",
            Language::English => "english",
            Language::Romanian => "romanian",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TokenizerKind {
    /// Splits on Unicode word boundaries.
    Words,
    /// Emits the whole value as a single term.
    Keyword,
}

/// Turns raw text into normalized terms.
///
/// Each stage can be switched off. An analyzer is bound to a field through the
/// [`Schema`](crate::Schema) so the same pipeline runs at index and query time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Analyzer {
    pub tokenizer: TokenizerKind,
    pub lowercase: bool,
    pub language: Language,
    pub remove_stopwords: bool,
    pub stem: bool,
    pub fold_diacritics: bool,
}

impl Default for Analyzer {
    fn default() -> Self {
        Self::standard()
    }
}

impl Analyzer {
    /// Word tokenizer with lowercasing and nothing else.
    pub fn standard() -> Self {
        Self {
            tokenizer: TokenizerKind::Words,
            lowercase: true,
            language: Language::None,
            remove_stopwords: false,
            stem: false,
            fold_diacritics: false,
        }
    }

    /// Full pipeline for a language: lowercase, stop words, stemming.
    pub fn for_language(language: Language) -> Self {
        Self {
            language,
            remove_stopwords: true,
            stem: true,
            ..Self::standard()
        }
    }

    /// Identity analyzer used for untokenized fields.
    pub fn keyword() -> Self {
        Self {
            tokenizer: TokenizerKind::Keyword,
            lowercase: false,
            language: Language::None,
            remove_stopwords: false,
            stem: false,
            fold_diacritics: false,
        }
    }

    pub fn with_diacritic_folding(mut self, fold: bool) -> Self {
        self.fold_diacritics = fold;
        self
    }

    pub fn is_keyword(&self) -> bool {
        self.tokenizer == TokenizerKind::Keyword
    }

    /// Analyze `text` into terms. Pure: the same input always yields the same terms.
    pub fn analyze(&self, text: &str) -> Vec<Term> {
        match self.tokenizer {
            TokenizerKind::Keyword => {
                if text.is_empty() {
                    Vec::new()
                } else {
                    vec![self.filter(text.to_string())]
                }
            }
            TokenizerKind::Words => {
                let normalized = text.nfkc().collect::<String>();
                let normalized = if self.lowercase { normalized.to_lowercase() } else { normalized };
                let stopwords = if self.remove_stopwords { self.language.stopwords() } else { None };
                let stemmer = if self.stem { self.language.algorithm().map(Stemmer::create) } else { None };

                let mut terms = Vec::new();
                for mat in WORD.find_iter(&normalized) {
                    let token = self.language.canonicalize(mat.as_str());
                    if stopwords.is_some_and(|s| s.contains(token.as_str())) {
                        continue;
                    }
                    let term = match &stemmer {
                        Some(stemmer) => stemmer.stem(&token).into_owned(),
                        None => token,
                    };
                    let term = self.filter(term);
                    if !term.is_empty() {
                        terms.push(term);
                    }
                }
                terms
            }
        }
    }

    fn filter(&self, term: String) -> String {
        if self.fold_diacritics {
            fold_diacritics(&term)
        } else {
            term
        }
    }
}

/// Strip combining marks after canonical decomposition (`ă` -> `a`).
pub fn fold_diacritics(text: &str) -> String {
    text.nfd().filter(|c| !is_combining_mark(*c)).nfc().collect()
}
