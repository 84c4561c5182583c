// Language Resources
// Per-language word lists used by segmentation, scoring, rewriting and verification

use crate::models::Language;
use regex::Regex;
use std::collections::HashSet;
use std::sync::OnceLock;

/// Sentence-initial connective and its replacement per academic level
/// ([high_school, university, phd]).
pub struct TransitionRule {
    pub from: &'static str,
    pub to: [&'static str; 3],
}

/// Word or phrase substitution per academic level; `None` leaves it alone at that level.
pub struct VocabRule {
    pub from: &'static str,
    pub to: [Option<&'static str>; 3],
}

pub struct Lexicon {
    pub language: Option<Language>,
    /// Lowercased tokens (without the trailing period) that never end a sentence.
    pub abbreviations: &'static [&'static str],
    pub function_words: &'static [&'static str],
    /// Typical share of function words in edited academic prose.
    pub typical_function_ratio: f64,
    pub ai_markers: &'static [&'static str],
    pub transitions: &'static [TransitionRule],
    /// Removable framing phrases; each ends right before the clause it introduces.
    pub fillers: &'static [&'static str],
    pub vocabulary: &'static [VocabRule],
    pub negations: &'static [&'static str],
    pub style_instruction: &'static str,
}

const fn t(from: &'static str, hs: &'static str, uni: &'static str, phd: &'static str) -> TransitionRule {
    TransitionRule { from, to: [hs, uni, phd] }
}

const fn v(
    from: &'static str,
    hs: Option<&'static str>,
    uni: Option<&'static str>,
    phd: Option<&'static str>,
) -> VocabRule {
    VocabRule { from, to: [hs, uni, phd] }
}

// ============ English ============

static EN: Lexicon = Lexicon {
    language: Some(Language::En),
    abbreviations: &[
        "e.g", "i.e", "et al", "al", "vs", "cf", "fig", "figs", "eq", "eqs", "dr", "mr", "mrs", "ms",
        "prof", "no", "vol", "pp", "p", "ch", "sec", "approx", "ca", "jr", "sr", "st", "u.s", "ph.d",
        "resp", "ed", "eds", "tab", "viz", "n.b",
    ],
    function_words: &[
        "the", "a", "an", "of", "in", "on", "at", "to", "for", "with", "by", "from", "and", "or",
        "but", "that", "this", "these", "those", "is", "are", "was", "were", "be", "been", "it",
        "its", "as", "which", "who", "not", "we", "our", "they", "their", "has", "have", "had",
        "can", "may", "will", "would", "should", "also", "than", "such", "into",
    ],
    typical_function_ratio: 0.42,
    ai_markers: &[
        "furthermore", "moreover", "additionally", "in addition", "it is important to note that",
        "it is worth noting that", "it should be noted that", "plays a crucial role",
        "plays a pivotal role", "crucial", "pivotal", "delve", "delves", "delve into",
        "comprehensive", "multifaceted", "landscape", "realm", "tapestry", "leverage", "leverages",
        "leveraging", "utilize", "utilizes", "utilizing", "facilitate", "facilitates", "robust",
        "seamless", "seamlessly", "notably", "underscore", "underscores", "in conclusion", "overall",
        "in today's", "ever-evolving", "a testament to", "navigate", "paramount", "significantly",
        "various", "foster", "fosters", "holistic", "intricate", "noteworthy",
    ],
    transitions: &[
        t("Furthermore", "Also", "Beyond that", "Further"),
        t("Moreover", "Also", "What is more", "Further"),
        t("Additionally", "Also", "On top of that", "In addition"),
        t("In addition", "Also", "Besides", "Beyond that"),
        t("In conclusion", "To sum up", "All in all", "Taken together"),
        t("Overall", "All in all", "On the whole", "On balance"),
        t("Consequently", "So", "As a result", "Accordingly"),
        t("Therefore", "So", "For this reason", "Accordingly"),
        t("Notably", "In particular", "Of note", "In particular"),
        t("However", "Still", "Even so", "Nevertheless"),
    ],
    fillers: &[
        "it is important to note that",
        "it is worth noting that",
        "it should be noted that",
        "it is crucial to recognize that",
        "it goes without saying that",
        "needless to say,",
    ],
    vocabulary: &[
        v("in order to", Some("to"), Some("to"), Some("to")),
        v("due to the fact that", Some("because"), Some("because"), Some("since")),
        v("a significant number of", Some("many"), Some("many"), Some("a considerable number of")),
        v("prior to", Some("before"), Some("before"), None),
        v("in the event that", Some("if"), Some("if"), None),
        v("plays a crucial role in", Some("matters a lot for"), Some("is central to"), Some("is integral to")),
        v("plays a pivotal role in", Some("matters a lot for"), Some("is central to"), Some("is integral to")),
        v("delve into", Some("look at"), Some("examine"), Some("investigate")),
        v("delves into", Some("looks at"), Some("examines"), Some("investigates")),
        v("utilize", Some("use"), Some("use"), Some("employ")),
        v("utilizes", Some("uses"), Some("uses"), Some("employs")),
        v("utilized", Some("used"), Some("used"), Some("employed")),
        v("utilizing", Some("using"), Some("using"), Some("employing")),
        v("leverage", Some("use"), Some("draw on"), None),
        v("leverages", Some("uses"), Some("draws on"), None),
        v("leveraging", Some("using"), Some("drawing on"), None),
        v("demonstrate", Some("show"), None, None),
        v("demonstrates", Some("shows"), None, None),
        v("demonstrated", Some("showed"), None, None),
        v("approximately", Some("about"), None, None),
        v("numerous", Some("many"), None, None),
        v("facilitate", Some("help"), Some("support"), None),
        v("facilitates", Some("helps"), Some("supports"), None),
        v("subsequently", Some("later"), Some("later"), None),
        v("commence", Some("start"), Some("begin"), None),
        v("methodology", Some("method"), None, None),
        v("sufficient", Some("enough"), None, None),
        v("ascertain", Some("find out"), Some("determine"), None),
        v("shows", None, None, Some("demonstrates")),
        v("showed", None, None, Some("demonstrated")),
        v("a lot of", None, Some("much"), Some("considerable")),
        v("lots of", None, Some("many"), Some("numerous")),
        v("big", None, None, Some("substantial")),
        v("look at", None, None, Some("examine")),
        v("looks at", None, None, Some("examines")),
        v("find out", None, None, Some("determine")),
    ],
    negations: &["not", "no", "never", "none", "neither", "nor", "without", "cannot", "n't"],
    style_instruction: "Use natural English academic writing conventions",
};

// ============ German ============

static DE: Lexicon = Lexicon {
    language: Some(Language::De),
    abbreviations: &[
        "z.b", "bzw", "usw", "vgl", "d.h", "nr", "ca", "u.a", "s", "dr", "prof", "bzgl", "ggf",
        "evtl", "inkl", "abb", "tab", "hrsg", "jh", "et al", "al", "sog", "z.t", "u.u", "o.ä",
    ],
    function_words: &[
        "der", "die", "das", "und", "in", "zu", "den", "von", "mit", "ist", "sich", "des", "auf",
        "für", "nicht", "ein", "eine", "dem", "im", "auch", "es", "an", "als", "wird", "werden",
        "sind", "bei", "oder", "dass", "aus", "wir", "zur", "zum",
    ],
    typical_function_ratio: 0.45,
    ai_markers: &[
        "darüber hinaus", "zudem", "des weiteren", "ferner", "es ist wichtig zu beachten",
        "es ist hervorzuheben", "spielt eine entscheidende rolle", "entscheidend", "umfassend",
        "umfassende", "zusammenfassend", "insgesamt", "vielfältig", "vielfältige", "maßgeblich",
        "nahtlos", "ganzheitlich",
    ],
    transitions: &[
        t("Darüber hinaus", "Außerdem", "Außerdem", "Überdies"),
        t("Des Weiteren", "Außerdem", "Daneben", "Überdies"),
        t("Zudem", "Außerdem", "Daneben", "Überdies"),
        t("Insgesamt", "Alles in allem", "Im Ganzen", "Im Ganzen"),
        t("Folglich", "Deshalb", "Daher", "Demzufolge"),
    ],
    fillers: &[],
    vocabulary: &[
        v("eine Vielzahl von", Some("viele"), Some("viele"), None),
        v("aufgrund der Tatsache, dass", Some("weil"), Some("weil"), Some("da")),
        v("spielt eine entscheidende Rolle", Some("ist sehr wichtig"), Some("ist zentral"), Some("ist von zentraler Bedeutung")),
        v("verwenden", None, None, Some("einsetzen")),
        v("zeigt", None, None, Some("belegt")),
    ],
    negations: &["nicht", "kein", "keine", "keiner", "keinen", "keinem", "nie", "niemals", "ohne"],
    style_instruction: "Follow German academic style with proper case usage and sentence structure",
};

// ============ French ============

static FR: Lexicon = Lexicon {
    language: Some(Language::Fr),
    abbreviations: &[
        "ex", "cf", "etc", "m", "mme", "mlle", "dr", "pr", "fig", "éd", "vol", "env", "et al", "al",
        "p", "pp", "chap", "av", "apr", "j.-c",
    ],
    function_words: &[
        "le", "la", "les", "de", "des", "du", "un", "une", "et", "en", "à", "au", "aux", "dans",
        "pour", "par", "sur", "que", "qui", "est", "sont", "il", "elle", "ce", "cette", "ne", "pas",
        "plus", "avec", "se", "son", "sa", "ses", "nous",
    ],
    typical_function_ratio: 0.46,
    ai_markers: &[
        "de plus", "en outre", "par ailleurs", "il est important de noter que",
        "il convient de noter que", "joue un rôle crucial", "joue un rôle essentiel", "crucial",
        "cruciale", "essentiel", "essentielle", "en conclusion", "dans l'ensemble", "notamment",
        "approfondi", "exhaustif",
    ],
    transitions: &[
        t("De plus", "En plus", "Par ailleurs", "Qui plus est"),
        t("En outre", "En plus", "Par ailleurs", "Qui plus est"),
        t("En conclusion", "Pour finir", "Au final", "En définitive"),
        t("Dans l'ensemble", "En gros", "Globalement", "Globalement"),
    ],
    fillers: &["il est important de noter que", "il convient de noter que"],
    vocabulary: &[
        v("afin de", Some("pour"), Some("pour"), None),
        v("en raison du fait que", Some("parce que"), Some("parce que"), Some("du fait que")),
        v("joue un rôle crucial dans", Some("compte beaucoup pour"), Some("est central pour"), Some("est déterminant pour")),
        v("utiliser", Some("employer"), None, None),
        v("montre", None, None, Some("démontre")),
    ],
    negations: &["ne", "pas", "jamais", "aucun", "aucune", "sans", "non", "rien"],
    style_instruction: "Apply French academic register with appropriate verb tenses",
};

// ============ Italian ============

static IT: Lexicon = Lexicon {
    language: Some(Language::It),
    abbreviations: &[
        "es", "ecc", "sig", "sigg", "dott", "prof", "pag", "pagg", "fig", "vol", "cap", "cfr",
        "et al", "al", "ca", "n", "sec",
    ],
    function_words: &[
        "il", "lo", "la", "i", "gli", "le", "di", "del", "della", "e", "in", "a", "che", "un",
        "una", "è", "sono", "per", "con", "non", "si", "da", "al", "come", "più", "questo",
        "questa", "nel", "nella", "dei",
    ],
    typical_function_ratio: 0.45,
    ai_markers: &[
        "inoltre", "in aggiunta", "è importante notare che", "va sottolineato che",
        "svolge un ruolo cruciale", "cruciale", "fondamentale", "in conclusione", "nel complesso",
        "approfondito", "esaustivo",
    ],
    transitions: &[
        t("Inoltre", "Poi", "Oltre a ciò", "Per di più"),
        t("In aggiunta", "Poi", "Oltre a ciò", "Per di più"),
        t("In conclusione", "Per finire", "In sintesi", "In definitiva"),
        t("Nel complesso", "In breve", "Tutto sommato", "Complessivamente"),
    ],
    fillers: &["è importante notare che", "va sottolineato che"],
    vocabulary: &[
        v("al fine di", Some("per"), Some("per"), None),
        v("utilizzare", Some("usare"), Some("usare"), Some("impiegare")),
        v("svolge un ruolo cruciale in", Some("conta molto in"), Some("è centrale in"), Some("è determinante in")),
        v("mostra", None, None, Some("dimostra")),
    ],
    negations: &["non", "mai", "nessuno", "nessuna", "senza", "né"],
    style_instruction: "Use Italian formal academic language with proper subjunctive",
};

// ============ Spanish ============

static ES: Lexicon = Lexicon {
    language: Some(Language::Es),
    abbreviations: &[
        "ej", "etc", "sr", "sra", "srta", "dr", "dra", "pág", "págs", "núm", "vol", "fig", "et al",
        "al", "ee.uu", "aprox", "cap", "p", "pp", "ud", "uds",
    ],
    function_words: &[
        "el", "la", "los", "las", "de", "del", "y", "en", "a", "que", "un", "una", "es", "son",
        "por", "para", "con", "se", "no", "su", "sus", "al", "lo", "como", "más", "o", "este",
        "esta", "nos",
    ],
    typical_function_ratio: 0.46,
    ai_markers: &[
        "además", "asimismo", "por otro lado", "es importante destacar que", "cabe destacar que",
        "desempeña un papel crucial", "crucial", "fundamental", "en conclusión", "en resumen",
        "exhaustivo", "integral",
    ],
    transitions: &[
        t("Además", "También", "Por otra parte", "A ello se suma que"),
        t("Asimismo", "También", "Del mismo modo", "Del mismo modo"),
        t("En conclusión", "Para terminar", "En suma", "En definitiva"),
        t("En resumen", "En pocas palabras", "En suma", "En síntesis"),
    ],
    fillers: &["es importante destacar que", "cabe destacar que"],
    vocabulary: &[
        v("con el fin de", Some("para"), Some("para"), None),
        v("debido al hecho de que", Some("porque"), Some("porque"), Some("dado que")),
        v("utilizar", Some("usar"), Some("usar"), Some("emplear")),
        v("desempeña un papel crucial en", Some("importa mucho en"), Some("es central en"), Some("resulta determinante en")),
        v("muestra", None, None, Some("demuestra")),
    ],
    negations: &["no", "nunca", "ningún", "ninguna", "ninguno", "sin", "jamás", "ni"],
    style_instruction: "Apply Spanish academic conventions with formal register",
};

// ============ Polish ============

static PL: Lexicon = Lexicon {
    language: Some(Language::Pl),
    abbreviations: &[
        "np", "tzn", "tj", "itd", "itp", "m.in", "dr", "prof", "mgr", "inż", "nr", "r", "w", "s",
        "ok", "tzw", "por", "zob", "et al", "al", "wg", "ryc", "tab", "godz",
    ],
    function_words: &[
        "i", "w", "na", "z", "do", "że", "się", "nie", "to", "jest", "są", "o", "od", "dla", "jak",
        "oraz", "a", "po", "przez", "by", "czy", "ten", "ta", "te", "jego", "jej", "we", "ze",
    ],
    typical_function_ratio: 0.38,
    ai_markers: &[
        "ponadto", "co więcej", "dodatkowo", "należy zauważyć, że", "warto zauważyć, że",
        "odgrywa kluczową rolę", "kluczowy", "kluczową", "kluczowe", "podsumowując",
        "w konsekwencji", "kompleksowy", "kompleksowe",
    ],
    transitions: &[
        t("Ponadto", "Poza tym", "Do tego", "Nadto"),
        t("Co więcej", "Poza tym", "Do tego", "Nadto"),
        t("Dodatkowo", "Poza tym", "Do tego", "Nadto"),
        t("Podsumowując", "Krótko mówiąc", "W sumie", "Reasumując"),
    ],
    fillers: &["należy zauważyć, że", "warto zauważyć, że"],
    vocabulary: &[
        v("wykorzystywać", Some("używać"), Some("używać"), None),
        v("odgrywa kluczową rolę w", Some("jest bardzo ważny w"), Some("jest istotny w"), Some("ma zasadnicze znaczenie w")),
        v("pokazuje", None, None, Some("dowodzi")),
    ],
    negations: &["nie", "nigdy", "żaden", "żadna", "żadne", "bez", "ani"],
    style_instruction: "Use Polish academic style with proper case endings and aspects",
};

// ============ Turkish ============

static TR: Lexicon = Lexicon {
    language: Some(Language::Tr),
    abbreviations: &[
        "vb", "vs", "dr", "prof", "doç", "bkz", "örn", "yy", "s", "no", "et al", "al", "çev", "haz",
        "yrd", "sf",
    ],
    function_words: &[
        "ve", "bir", "bu", "da", "de", "ile", "için", "olarak", "gibi", "çok", "daha", "en", "ki",
        "ne", "o", "olan", "ama", "veya", "her", "şu", "kadar", "sonra", "değil",
    ],
    typical_function_ratio: 0.30,
    ai_markers: &[
        "ayrıca", "bunun yanı sıra", "ek olarak", "önemle belirtmek gerekir ki",
        "belirtmek gerekir ki", "kritik bir rol oynamaktadır", "kritik", "sonuç olarak",
        "genel olarak", "kapsamlı",
    ],
    transitions: &[
        t("Bunun yanı sıra", "Ayrıca", "Bunun yanında", "Buna ek olarak"),
        t("Ek olarak", "Ayrıca", "Bunun yanında", "Buna ilaveten"),
        t("Sonuç olarak", "Kısacası", "Özetle", "Neticede"),
        t("Genel olarak", "Kısacası", "Genelde", "Bütünüyle"),
    ],
    fillers: &["önemle belirtmek gerekir ki", "belirtmek gerekir ki"],
    vocabulary: &[
        v("kritik bir rol oynamaktadır", Some("çok önemlidir"), Some("merkezî bir yere sahiptir"), Some("belirleyici bir öneme sahiptir")),
        v("göstermektedir", None, None, Some("ortaya koymaktadır")),
    ],
    negations: &["değil", "yok", "hiç", "asla", "hiçbir"],
    style_instruction: "Apply Turkish academic writing conventions",
};

// ============ Generic fallback ============

static GENERIC: Lexicon = Lexicon {
    language: None,
    abbreviations: &["e.g", "i.e", "et al", "al", "etc", "cf", "fig", "vol", "pp", "p", "no", "dr", "prof"],
    function_words: &[],
    typical_function_ratio: 0.0,
    ai_markers: &[],
    transitions: &[],
    fillers: &[],
    vocabulary: &[],
    negations: &[],
    style_instruction: "Follow the academic writing conventions of the source language",
};

pub fn lexicon_for(language: Option<Language>) -> &'static Lexicon {
    match language {
        Some(Language::En) => &EN,
        Some(Language::De) => &DE,
        Some(Language::Fr) => &FR,
        Some(Language::It) => &IT,
        Some(Language::Es) => &ES,
        Some(Language::Pl) => &PL,
        Some(Language::Tr) => &TR,
        None => &GENERIC,
    }
}

// ============ Compiled matchers ============

/// Lookup sets and regexes derived from a `Lexicon`, built once per process.
pub struct CompiledLexicon {
    pub lexicon: &'static Lexicon,
    pub abbreviations: HashSet<&'static str>,
    pub function_words: HashSet<&'static str>,
    pub negations: HashSet<&'static str>,
    pub markers: Option<Regex>,
    pub transitions: Vec<(Regex, &'static TransitionRule)>,
    pub fillers: Vec<Regex>,
    pub vocabulary: Vec<(Regex, &'static VocabRule)>,
}

fn phrase_pattern(phrase: &str) -> String {
    // Flexible whitespace inside multi-word phrases.
    phrase
        .split_whitespace()
        .map(regex::escape)
        .collect::<Vec<_>>()
        .join(r"\s+")
}

fn compile(lexicon: &'static Lexicon) -> CompiledLexicon {
    let markers = if lexicon.ai_markers.is_empty() {
        None
    } else {
        let mut phrases: Vec<&str> = lexicon.ai_markers.to_vec();
        // Longest first so multi-word markers win over their parts.
        phrases.sort_by_key(|p| std::cmp::Reverse(p.len()));
        let alt = phrases.iter().map(|p| phrase_pattern(p)).collect::<Vec<_>>().join("|");
        Some(Regex::new(&format!(r"(?i)\b(?:{})\b", alt)).expect("marker regex"))
    };

    let transitions = lexicon
        .transitions
        .iter()
        .map(|rule| {
            let re = Regex::new(&format!(r"(?i)^({})(?:,|\s)", phrase_pattern(rule.from)))
                .expect("transition regex");
            (re, rule)
        })
        .collect();

    let fillers = lexicon
        .fillers
        .iter()
        .map(|phrase| {
            Regex::new(&format!(r"(?i)\b{}\s+", phrase_pattern(phrase))).expect("filler regex")
        })
        .collect();

    let vocabulary = lexicon
        .vocabulary
        .iter()
        .map(|rule| {
            let re = Regex::new(&format!(r"(?i)\b{}\b", phrase_pattern(rule.from)))
                .expect("vocabulary regex");
            (re, rule)
        })
        .collect();

    CompiledLexicon {
        lexicon,
        abbreviations: lexicon.abbreviations.iter().copied().collect(),
        function_words: lexicon.function_words.iter().copied().collect(),
        negations: lexicon.negations.iter().copied().collect(),
        markers,
        transitions,
        fillers,
        vocabulary,
    }
}

fn slot(language: Option<Language>) -> usize {
    match language {
        Some(lang) => Language::ALL.iter().position(|l| *l == lang).unwrap_or(0) + 1,
        None => 0,
    }
}

pub fn compiled(language: Option<Language>) -> &'static CompiledLexicon {
    static COMPILED: OnceLock<Vec<CompiledLexicon>> = OnceLock::new();
    let all = COMPILED.get_or_init(|| {
        let mut out = vec![compile(lexicon_for(None))];
        out.extend(Language::ALL.iter().map(|lang| compile(lexicon_for(Some(*lang)))));
        out
    });
    &all[slot(language)]
}
