// ISO 639-2 三字母语言代码 -> ISO 639-1 两字母代码
// 同时包含书目代码（B）和术语代码（T），例如 ger/deu 都映射到 de

const ISO_639_2_TO_1: &[(&str, &str)] = &[
    ("aar", "aa"), ("abk", "ab"), ("afr", "af"), ("aka", "ak"), ("alb", "sq"),
    ("amh", "am"), ("ara", "ar"), ("arg", "an"), ("arm", "hy"), ("asm", "as"),
    ("aze", "az"), ("bak", "ba"), ("baq", "eu"), ("bel", "be"), ("ben", "bn"),
    ("bod", "bo"), ("bos", "bs"), ("bre", "br"), ("bul", "bg"), ("bur", "my"),
    ("cat", "ca"), ("ces", "cs"), ("chi", "zh"), ("cor", "kw"), ("cos", "co"),
    ("cym", "cy"), ("cze", "cs"), ("dan", "da"), ("deu", "de"), ("dut", "nl"),
    ("ell", "el"), ("eng", "en"), ("epo", "eo"), ("est", "et"), ("eus", "eu"),
    ("fao", "fo"), ("fas", "fa"), ("fin", "fi"), ("fra", "fr"), ("fre", "fr"),
    ("fry", "fy"), ("geo", "ka"), ("ger", "de"), ("gla", "gd"), ("gle", "ga"),
    ("glg", "gl"), ("gre", "el"), ("guj", "gu"), ("hat", "ht"), ("hau", "ha"),
    ("heb", "he"), ("hin", "hi"), ("hrv", "hr"), ("hun", "hu"), ("hye", "hy"),
    ("ibo", "ig"), ("ice", "is"), ("ind", "id"), ("isl", "is"), ("ita", "it"),
    ("jav", "jv"), ("jpn", "ja"), ("kan", "kn"), ("kat", "ka"), ("kaz", "kk"),
    ("khm", "km"), ("kin", "rw"), ("kir", "ky"), ("kor", "ko"), ("kur", "ku"),
    ("lao", "lo"), ("lat", "la"), ("lav", "lv"), ("lit", "lt"), ("ltz", "lb"),
    ("mac", "mk"), ("mal", "ml"), ("mao", "mi"), ("mar", "mr"), ("may", "ms"),
    ("mkd", "mk"), ("mlg", "mg"), ("mlt", "mt"), ("mon", "mn"), ("mri", "mi"),
    ("msa", "ms"), ("mya", "my"), ("nep", "ne"), ("nld", "nl"), ("nno", "nn"),
    ("nob", "nb"), ("nor", "no"), ("oci", "oc"), ("ori", "or"), ("pan", "pa"),
    ("per", "fa"), ("pol", "pl"), ("por", "pt"), ("pus", "ps"), ("que", "qu"),
    ("roh", "rm"), ("ron", "ro"), ("rum", "ro"), ("rus", "ru"), ("san", "sa"),
    ("sin", "si"), ("slk", "sk"), ("slo", "sk"), ("slv", "sl"), ("smo", "sm"),
    ("sna", "sn"), ("snd", "sd"), ("som", "so"), ("spa", "es"), ("sqi", "sq"),
    ("srp", "sr"), ("swa", "sw"), ("swe", "sv"), ("tam", "ta"), ("tat", "tt"),
    ("tel", "te"), ("tgk", "tg"), ("tgl", "tl"), ("tha", "th"), ("tib", "bo"),
    ("tur", "tr"), ("ukr", "uk"), ("urd", "ur"), ("uzb", "uz"), ("vie", "vi"),
    ("wel", "cy"), ("xho", "xh"), ("yid", "yi"), ("yor", "yo"), ("zho", "zh"),
    ("zul", "zu"),
];

/// 把三字母语言代码映射为两字母代码，找不到返回 None
pub fn iso_639_2_to_1(code: &str) -> Option<&'static str> {
    let code = code.trim().to_ascii_lowercase();
    ISO_639_2_TO_1
        .binary_search_by(|(three, _)| (*three).cmp(code.as_str()))
        .ok()
        .and_then(|index| ISO_639_2_TO_1.get(index))
        .map(|(_, two)| *two)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_is_sorted() {
        assert!(ISO_639_2_TO_1.windows(2).all(|pair| pair[0].0 < pair[1].0));
    }

    #[test]
    fn test_lookup() {
        assert_eq!(iso_639_2_to_1("eng"), Some("en"));
        assert_eq!(iso_639_2_to_1("ger"), Some("de"));
        assert_eq!(iso_639_2_to_1("deu"), Some("de"));
        assert_eq!(iso_639_2_to_1("CHI"), Some("zh"));
        assert_eq!(iso_639_2_to_1("jpn"), Some("ja"));
        assert_eq!(iso_639_2_to_1("und"), None);
        assert_eq!(iso_639_2_to_1(""), None);
    }
}
