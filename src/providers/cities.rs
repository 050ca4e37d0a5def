//! City name → provider code lookup.
//!
//! Aviasales wants IATA city codes, Yandex Rasp wants its own settlement
//! codes. Users type city names in Russian or English, so both spellings map
//! to the same entry.

/// Codes for one city.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CityCodes {
    pub iata: &'static str,
    pub yandex: &'static str,
}

struct City {
    names: &'static [&'static str],
    codes: CityCodes,
}

const CITIES: &[City] = &[
    City {
        names: &["москва", "moscow", "msk"],
        codes: CityCodes { iata: "MOW", yandex: "c213" },
    },
    City {
        names: &["санкт петербург", "петербург", "спб", "saint petersburg", "st petersburg", "spb"],
        codes: CityCodes { iata: "LED", yandex: "c2" },
    },
    City {
        names: &["екатеринбург", "yekaterinburg", "ekaterinburg"],
        codes: CityCodes { iata: "SVX", yandex: "c54" },
    },
    City {
        names: &["челябинск", "chelyabinsk"],
        codes: CityCodes { iata: "CEK", yandex: "c56" },
    },
    City {
        names: &["казань", "kazan"],
        codes: CityCodes { iata: "KZN", yandex: "c43" },
    },
    City {
        names: &["сочи", "sochi"],
        codes: CityCodes { iata: "AER", yandex: "c239" },
    },
    City {
        names: &["симферополь", "simferopol"],
        codes: CityCodes { iata: "SIP", yandex: "c146" },
    },
    City {
        names: &["новосибирск", "novosibirsk"],
        codes: CityCodes { iata: "OVB", yandex: "c65" },
    },
    City {
        names: &["нижний новгород", "nizhny novgorod"],
        codes: CityCodes { iata: "GOJ", yandex: "c47" },
    },
    City {
        names: &["калининград", "kaliningrad"],
        codes: CityCodes { iata: "KGD", yandex: "c22" },
    },
    City {
        names: &["самара", "samara"],
        codes: CityCodes { iata: "KUF", yandex: "c51" },
    },
    City {
        names: &["краснодар", "krasnodar"],
        codes: CityCodes { iata: "KRR", yandex: "c35" },
    },
];

/// Look up the provider codes for a city name typed by a user.
pub fn lookup(name: &str) -> Option<CityCodes> {
    let key = normalize(name);
    CITIES
        .iter()
        .find(|city| city.names.contains(&key.as_str()))
        .map(|city| city.codes)
}

/// Lowercase, fold `ё`, treat `-` and `.` as spaces, collapse whitespace.
fn normalize(name: &str) -> String {
    let folded: String = name
        .to_lowercase()
        .chars()
        .map(|c| match c {
            'ё' => 'е',
            '-' | '.' => ' ',
            other => other,
        })
        .collect();
    folded.split_whitespace().collect::<Vec<_>>().join(" ")
}
