//! Built-in table of well-known ScummVM games.

use once_cell::sync::Lazy;

use crate::models::GameRecord;

struct Entry {
    id: &'static str,
    name: &'static str,
    engine: &'static str,
    description: &'static str,
    year: &'static str,
    company: &'static str,
    platform: &'static str,
    genre: &'static str,
    compatibility: &'static str,
}

const ENTRIES: &[Entry] = &[
    Entry {
        id: "monkey",
        name: "The Secret of Monkey Island",
        engine: "scumm",
        description: "A young man named Guybrush Threepwood arrives on Mêlée Island with the dream of becoming a pirate.",
        year: "1990",
        company: "LucasArts",
        platform: "DOS/Amiga/FM-Towns",
        genre: "Adventure",
        compatibility: "Excellent",
    },
    Entry {
        id: "monkey2",
        name: "Monkey Island 2: LeChuck's Revenge",
        engine: "scumm",
        description: "Guybrush Threepwood tells the tale of his search for the legendary treasure of Big Whoop.",
        year: "1991",
        company: "LucasArts",
        platform: "DOS/Amiga/FM-Towns",
        genre: "Adventure",
        compatibility: "Excellent",
    },
    Entry {
        id: "atlantis",
        name: "Indiana Jones and the Fate of Atlantis",
        engine: "scumm",
        description: "Indiana Jones must stop the Nazis from harnessing the power of Atlantis.",
        year: "1992",
        company: "LucasArts",
        platform: "DOS/Amiga/FM-Towns",
        genre: "Adventure",
        compatibility: "Excellent",
    },
    Entry {
        id: "tentacle",
        name: "Day of the Tentacle",
        engine: "scumm",
        description: "Purple Tentacle drinks toxic sludge and becomes evil. Bernard, Hoagie and Laverne must stop him across time.",
        year: "1993",
        company: "LucasArts",
        platform: "DOS",
        genre: "Adventure",
        compatibility: "Excellent",
    },
    Entry {
        id: "samnmax",
        name: "Sam & Max Hit the Road",
        engine: "scumm",
        description: "Sam & Max investigate a missing bigfoot from a carnival freak show.",
        year: "1993",
        company: "LucasArts",
        platform: "DOS",
        genre: "Adventure",
        compatibility: "Excellent",
    },
    Entry {
        id: "dig",
        name: "The Dig",
        engine: "scumm",
        description: "An asteroid threatens Earth. A team sent to divert it discovers an alien world.",
        year: "1995",
        company: "LucasArts",
        platform: "DOS",
        genre: "Sci-Fi",
        compatibility: "Excellent",
    },
    Entry {
        id: "ft",
        name: "Full Throttle",
        engine: "scumm",
        description: "Ben, leader of the Polecats biker gang, is framed for murder.",
        year: "1995",
        company: "LucasArts",
        platform: "DOS",
        genre: "Adventure",
        compatibility: "Excellent",
    },
    Entry {
        id: "comi",
        name: "The Curse of Monkey Island",
        engine: "scumm",
        description: "Guybrush accidentally places a cursed ring on Elaine's finger and must find the cure.",
        year: "1997",
        company: "LucasArts",
        platform: "Windows",
        genre: "Adventure",
        compatibility: "Excellent",
    },
    Entry {
        id: "grim",
        name: "Grim Fandango",
        engine: "grim",
        description: "Manny Calavera, a travel agent in the Land of the Dead, uncovers a conspiracy.",
        year: "1998",
        company: "LucasArts",
        platform: "Windows",
        genre: "Adventure",
        compatibility: "Good",
    },
    Entry {
        id: "maniac",
        name: "Maniac Mansion",
        engine: "scumm",
        description: "Dave and friends infiltrate a mad scientist's mansion to rescue Sandy.",
        year: "1987",
        company: "LucasArts",
        platform: "C64/DOS/NES",
        genre: "Adventure",
        compatibility: "Excellent",
    },
    Entry {
        id: "loom",
        name: "Loom",
        engine: "scumm",
        description: "Bobbin Threadbare, a young Weaver, must unravel the mystery of the Great Loom.",
        year: "1990",
        company: "LucasArts",
        platform: "DOS/FM-Towns",
        genre: "Fantasy",
        compatibility: "Excellent",
    },
    Entry {
        id: "zak",
        name: "Zak McKracken and the Alien Mindbenders",
        engine: "scumm",
        description: "Tabloid journalist Zak McKracken stumbles upon an alien conspiracy.",
        year: "1988",
        company: "LucasArts",
        platform: "C64/DOS/FM-Towns",
        genre: "Sci-Fi",
        compatibility: "Excellent",
    },
    Entry {
        id: "sky",
        name: "Beneath a Steel Sky",
        engine: "sky",
        description: "Robert Foster escapes Union City's oppressive regime with his robot companion Joey.",
        year: "1994",
        company: "Revolution",
        platform: "DOS/Amiga",
        genre: "Sci-Fi",
        compatibility: "Excellent",
    },
    Entry {
        id: "sword1",
        name: "Broken Sword: Shadow of the Templars",
        engine: "sword1",
        description: "George Stobbart investigates a bombing in Paris linked to the Knights Templar.",
        year: "1996",
        company: "Revolution",
        platform: "DOS/Windows/PS1",
        genre: "Mystery",
        compatibility: "Excellent",
    },
    Entry {
        id: "sword2",
        name: "Broken Sword II: The Smoking Mirror",
        engine: "sword2",
        description: "George and Nico investigate a drug lord's connection to a Mayan prophecy.",
        year: "1997",
        company: "Revolution",
        platform: "Windows/PS1",
        genre: "Mystery",
        compatibility: "Excellent",
    },
    Entry {
        id: "queen",
        name: "Flight of the Amazon Queen",
        engine: "queen",
        description: "Pilot Joe King crash-lands in the Amazon and must stop a mad scientist.",
        year: "1995",
        company: "Interactive Binary Illusions",
        platform: "DOS/Amiga",
        genre: "Adventure",
        compatibility: "Excellent",
    },
    Entry {
        id: "simon1",
        name: "Simon the Sorcerer",
        engine: "agos",
        description: "Simon is transported to a fantasy world and must rescue a wizard from an evil sorcerer.",
        year: "1993",
        company: "Adventure Soft",
        platform: "DOS/Amiga",
        genre: "Fantasy",
        compatibility: "Excellent",
    },
    Entry {
        id: "simon2",
        name: "Simon the Sorcerer II",
        engine: "agos",
        description: "Simon returns to the fantasy world and must stop the evil sorcerer Sordid again.",
        year: "1995",
        company: "Adventure Soft",
        platform: "DOS/Windows",
        genre: "Fantasy",
        compatibility: "Excellent",
    },
    Entry {
        id: "kyra1",
        name: "The Legend of Kyrandia",
        engine: "kyra",
        description: "Brandon must stop the evil jester Malcolm who has turned the land to stone.",
        year: "1992",
        company: "Westwood Studios",
        platform: "DOS",
        genre: "Fantasy",
        compatibility: "Excellent",
    },
    Entry {
        id: "kyra2",
        name: "The Legend of Kyrandia: Hand of Fate",
        engine: "kyra",
        description: "Zanthia must find an anchor stone to stop the land from disappearing.",
        year: "1993",
        company: "Westwood Studios",
        platform: "DOS",
        genre: "Fantasy",
        compatibility: "Excellent",
    },
    Entry {
        id: "kyra3",
        name: "The Legend of Kyrandia: Malcolm's Revenge",
        engine: "kyra",
        description: "Malcolm escapes prison and must clear his name.",
        year: "1994",
        company: "Westwood Studios",
        platform: "DOS",
        genre: "Fantasy",
        compatibility: "Good",
    },
    Entry {
        id: "lure",
        name: "Lure of the Temptress",
        engine: "lure",
        description: "Diermot must free the town of Turnvale from the enchantress Selena.",
        year: "1992",
        company: "Revolution",
        platform: "DOS/Amiga",
        genre: "Fantasy",
        compatibility: "Good",
    },
    Entry {
        id: "touche",
        name: "Touché: The Adventures of the Fifth Musketeer",
        engine: "touche",
        description: "Geoffroi Le Bansen seeks to become the Fifth Musketeer.",
        year: "1995",
        company: "Clipper Software",
        platform: "DOS",
        genre: "Adventure",
        compatibility: "Good",
    },
    Entry {
        id: "drascula",
        name: "Drascula: The Vampire Strikes Back",
        engine: "drascula",
        description: "John Hacker must rescue his girlfriend from the vampire Drascula.",
        year: "1996",
        company: "Alcachofa Soft",
        platform: "DOS",
        genre: "Comedy",
        compatibility: "Good",
    },
    Entry {
        id: "myst",
        name: "Myst",
        engine: "mohawk",
        description: "Explore the mysterious island of Myst and unravel its secrets.",
        year: "1993",
        company: "Cyan",
        platform: "Mac/Windows",
        genre: "Puzzle",
        compatibility: "Good",
    },
    Entry {
        id: "riven",
        name: "Riven: The Sequel to Myst",
        engine: "mohawk",
        description: "Continue the story on the Age of Riven.",
        year: "1997",
        company: "Cyan",
        platform: "Mac/Windows",
        genre: "Puzzle",
        compatibility: "Good",
    },
    Entry {
        id: "agi-fanmade",
        name: "AGI Fan Games",
        engine: "agi",
        description: "Fan-made games using the AGI engine.",
        year: "",
        company: "Various",
        platform: "DOS",
        genre: "Fan-made",
        compatibility: "Fair",
    },
    Entry {
        id: "sci-fanmade",
        name: "SCI Fan Games",
        engine: "sci",
        description: "Fan-made games using the SCI engine.",
        year: "",
        company: "Various",
        platform: "DOS",
        genre: "Fan-made",
        compatibility: "Fair",
    },
    Entry {
        id: "bass",
        name: "Beneath a Steel Sky (Remastered)",
        engine: "sky",
        description: "Remastered version with enhanced audio and graphics.",
        year: "2009",
        company: "Revolution",
        platform: "iOS/Android",
        genre: "Sci-Fi",
        compatibility: "Good",
    },
    Entry {
        id: "dreamweb",
        name: "DreamWeb",
        engine: "dreamweb",
        description: "Ryan must prevent the Apocalypse in this cyberpunk adventure.",
        year: "1994",
        company: "Creative Reality",
        platform: "DOS",
        genre: "Sci-Fi",
        compatibility: "Good",
    },
];

static KNOWN_GAMES: Lazy<Vec<GameRecord>> = Lazy::new(|| {
    ENTRIES
        .iter()
        .map(|entry| GameRecord {
            id: entry.id.to_string(),
            name: entry.name.to_string(),
            engine: entry.engine.to_string(),
            description: entry.description.to_string(),
            year: entry.year.to_string(),
            company: entry.company.to_string(),
            platform: entry.platform.to_string(),
            genre: entry.genre.to_string(),
            compatibility: entry.compatibility.to_string(),
            ..GameRecord::default()
        })
        .collect()
});

/// The static catalog, in table order.
pub fn known_games() -> &'static [GameRecord] {
    &KNOWN_GAMES
}

/// Look up a catalog entry by id.
pub fn find(id: &str) -> Option<&'static GameRecord> {
    KNOWN_GAMES.iter().find(|game| game.id == id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn ids_are_unique() {
        let ids: HashSet<_> = known_games().iter().map(|game| game.id.as_str()).collect();
        assert_eq!(ids.len(), known_games().len());
    }

    #[test]
    fn entries_carry_metadata() {
        let samnmax = find("samnmax").expect("samnmax in catalog");
        assert_eq!(samnmax.company, "LucasArts");
        assert_eq!(samnmax.engine, "scumm");
        assert!(!samnmax.installed);
        assert_eq!(samnmax.icon_name(), "samnmax");
        assert!(find("nonexistent").is_none());
    }
}
