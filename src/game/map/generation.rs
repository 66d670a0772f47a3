//! Floor layout generation.
//!
//! A floor is a square grid of chunks. A random walk carves the main path
//! from the start chunk to the end chunk, branches hang off that path, and
//! every pair of occupied neighbours is joined by a hallway. Each chunk then
//! rasterizes into tiles: a centered room, hallway corridors running to the
//! chunk edges, and a ring of walls around everything walkable.

use std::collections::{HashSet, VecDeque};

use bevy::prelude::*;
use rand::{Rng, SeedableRng, rngs::StdRng, seq::SliceRandom};

/// Chunks per side.
pub const MAP_CHUNKS: i32 = 5;
/// Tiles per chunk side.
pub const CHUNK_TILES: i32 = 40;
/// World units per tile side.
pub const TILE_SIZE: f32 = 20.0;
/// Hallway width in tiles.
pub const HALLWAY_WIDTH: i32 = 6;
/// Start and end rooms are this many tiles square.
const FIXED_ROOM_TILES: i32 = 12;
/// Normal room sides are twice a value in this range.
const ROOM_HALF_SIDE: std::ops::RangeInclusive<i32> = 10..=15;

const MAP_TILES: i32 = MAP_CHUNKS * CHUNK_TILES;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

impl Direction {
    pub const ALL: [Self; 4] = [Self::Up, Self::Down, Self::Left, Self::Right];

    pub fn offset(self) -> IVec2 {
        match self {
            Self::Up => IVec2::Y,
            Self::Down => IVec2::NEG_Y,
            Self::Left => IVec2::NEG_X,
            Self::Right => IVec2::X,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ChunkKind {
    #[default]
    Empty,
    Start,
    End,
    Normal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Hallways {
    pub up: bool,
    pub down: bool,
    pub left: bool,
    pub right: bool,
}

impl Hallways {
    pub fn has(&self, direction: Direction) -> bool {
        match direction {
            Direction::Up => self.up,
            Direction::Down => self.down,
            Direction::Left => self.left,
            Direction::Right => self.right,
        }
    }

    fn set(&mut self, direction: Direction) {
        match direction {
            Direction::Up => self.up = true,
            Direction::Down => self.down = true,
            Direction::Left => self.left = true,
            Direction::Right => self.right = true,
        }
    }
}

/// Tile-space rectangle, `max` exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TileRect {
    pub min: IVec2,
    pub max: IVec2,
}

impl TileRect {
    pub fn new(min: IVec2, max: IVec2) -> Self {
        Self { min, max }
    }

    pub fn size(&self) -> IVec2 {
        self.max - self.min
    }

    pub fn contains(&self, tile: IVec2) -> bool {
        tile.x >= self.min.x && tile.y >= self.min.y && tile.x < self.max.x && tile.y < self.max.y
    }

    /// The same area in world units.
    pub fn to_world(self) -> Rect {
        Rect::from_corners(
            self.min.as_vec2() * TILE_SIZE,
            self.max.as_vec2() * TILE_SIZE,
        )
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Chunk {
    pub kind: ChunkKind,
    /// Room size in tiles.
    pub room: IVec2,
    pub hallways: Hallways,
}

impl Chunk {
    pub fn is_empty(&self) -> bool {
        self.kind == ChunkKind::Empty
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Tile {
    #[default]
    Void,
    Floor,
    Wall,
}

/// A generated floor.
#[derive(Debug, Clone)]
pub struct FloorLayout {
    pub seed: u64,
    pub start: IVec2,
    pub end: IVec2,
    pub main_path: Vec<IVec2>,
    chunks: Vec<Chunk>,
    tiles: Vec<Tile>,
    floor_rects: Vec<TileRect>,
}

fn in_bounds(chunk: IVec2) -> bool {
    chunk.x >= 0 && chunk.y >= 0 && chunk.x < MAP_CHUNKS && chunk.y < MAP_CHUNKS
}

fn chunk_index(chunk: IVec2) -> usize {
    (chunk.y * MAP_CHUNKS + chunk.x) as usize
}

impl FloorLayout {
    pub fn chunk(&self, chunk: IVec2) -> Option<&Chunk> {
        in_bounds(chunk).then(|| &self.chunks[chunk_index(chunk)])
    }

    /// Occupied chunks and their coordinates.
    pub fn rooms(&self) -> impl Iterator<Item = (IVec2, &Chunk)> {
        self.chunks.iter().enumerate().filter_map(|(index, chunk)| {
            let coord = IVec2::new(index as i32 % MAP_CHUNKS, index as i32 / MAP_CHUNKS);
            (!chunk.is_empty()).then_some((coord, chunk))
        })
    }

    pub fn room_count(&self) -> usize {
        self.rooms().count()
    }

    /// The room of `chunk` in global tile coordinates.
    pub fn room_rect(&self, chunk: IVec2) -> Option<TileRect> {
        let room = self.chunk(chunk).filter(|c| !c.is_empty())?.room;
        let min = chunk * CHUNK_TILES + (IVec2::splat(CHUNK_TILES) - room) / 2;
        Some(TileRect::new(min, min + room))
    }

    pub fn chunk_center_world(chunk: IVec2) -> Vec2 {
        (chunk * CHUNK_TILES + IVec2::splat(CHUNK_TILES / 2)).as_vec2() * TILE_SIZE
    }

    pub fn chunk_at_world(position: Vec2) -> Option<IVec2> {
        let chunk = (position / (TILE_SIZE * CHUNK_TILES as f32)).floor().as_ivec2();
        (position.x >= 0.0 && position.y >= 0.0 && in_bounds(chunk)).then_some(chunk)
    }

    pub fn tile_at_world(position: Vec2) -> IVec2 {
        (position / TILE_SIZE).floor().as_ivec2()
    }

    pub fn tile_center_world(tile: IVec2) -> Vec2 {
        (tile.as_vec2() + Vec2::splat(0.5)) * TILE_SIZE
    }

    pub fn tile(&self, tile: IVec2) -> Tile {
        if tile.x < 0 || tile.y < 0 || tile.x >= MAP_TILES || tile.y >= MAP_TILES {
            return Tile::Void;
        }
        self.tiles[(tile.y * MAP_TILES + tile.x) as usize]
    }

    pub fn is_walkable(&self, tile: IVec2) -> bool {
        self.tile(tile) == Tile::Floor
    }

    /// World position of a random tile inside the room, one tile clear of its walls.
    pub fn random_tile_in_room(&self, chunk: IVec2, rng: &mut impl Rng) -> Option<Vec2> {
        let rect = self.room_rect(chunk)?;
        let min = rect.min + IVec2::ONE;
        let max = rect.max - IVec2::ONE;
        if min.x >= max.x || min.y >= max.y {
            return None;
        }
        let tile = IVec2::new(rng.random_range(min.x..max.x), rng.random_range(min.y..max.y));
        Some(Self::tile_center_world(tile))
    }

    /// True when no wall or void tile lies on the segment, sampled every half tile.
    pub fn line_of_sight(&self, from: Vec2, to: Vec2) -> bool {
        let delta = to - from;
        let steps = (delta.length() / (TILE_SIZE / 2.0)).ceil() as i32;
        (0..=steps).all(|step| {
            let t = if steps == 0 { 0.0 } else { step as f32 / steps as f32 };
            self.is_walkable(Self::tile_at_world(from + delta * t))
        })
    }

    /// Rooms and hallway corridors, for drawing the floor.
    pub fn floor_rects(&self) -> &[TileRect] {
        &self.floor_rects
    }

    /// Wall tiles merged into as few rectangles as possible.
    pub fn wall_rects(&self) -> Vec<TileRect> {
        let mut done: Vec<TileRect> = Vec::new();
        // Rects still growing upward, keyed by their horizontal span.
        let mut open: Vec<TileRect> = Vec::new();

        for y in 0..MAP_TILES {
            let mut runs = Vec::new();
            let mut x = 0;
            while x < MAP_TILES {
                if self.tile(IVec2::new(x, y)) != Tile::Wall {
                    x += 1;
                    continue;
                }
                let start = x;
                while x < MAP_TILES && self.tile(IVec2::new(x, y)) == Tile::Wall {
                    x += 1;
                }
                runs.push((start, x));
            }

            let mut next_open = Vec::with_capacity(runs.len());
            for (start, end) in runs {
                if let Some(pos) = open
                    .iter()
                    .position(|rect| rect.min.x == start && rect.max.x == end)
                {
                    let mut rect = open.swap_remove(pos);
                    rect.max.y = y + 1;
                    next_open.push(rect);
                } else {
                    next_open.push(TileRect::new(IVec2::new(start, y), IVec2::new(end, y + 1)));
                }
            }
            done.append(&mut open);
            open = next_open;
        }

        done.append(&mut open);
        done
    }

    /// Breadth-first walk over hallways, returning every chunk reachable from start.
    pub fn reachable_from_start(&self) -> HashSet<IVec2> {
        let mut visited = HashSet::from([self.start]);
        let mut queue = VecDeque::from([self.start]);

        while let Some(coord) = queue.pop_front() {
            let Some(chunk) = self.chunk(coord) else {
                continue;
            };
            for direction in Direction::ALL {
                let next = coord + direction.offset();
                if chunk.hallways.has(direction)
                    && self.chunk(next).is_some_and(|c| !c.is_empty())
                    && visited.insert(next)
                {
                    queue.push_back(next);
                }
            }
        }

        visited
    }
}

fn branch_count(rng: &mut impl Rng) -> usize {
    match rng.random::<f32>() {
        r if r < 0.4 => 1,
        r if r < 0.8 => 2,
        r if r < 0.9 => 3,
        _ => 4,
    }
}

fn normal_room(rng: &mut impl Rng) -> IVec2 {
    IVec2::new(
        rng.random_range(ROOM_HALF_SIDE) * 2,
        rng.random_range(ROOM_HALF_SIDE) * 2,
    )
}

/// Generate a floor. The same seed always gives the same floor.
pub fn generate_floor(seed: u64) -> FloorLayout {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut chunks = vec![Chunk::default(); (MAP_CHUNKS * MAP_CHUNKS) as usize];

    let start = IVec2::splat(MAP_CHUNKS / 2);
    let far = (MAP_CHUNKS / 2 + 1)..=(MAP_CHUNKS - 1);
    let end = IVec2::new(rng.random_range(far.clone()), rng.random_range(far));

    chunks[chunk_index(start)] = Chunk {
        kind: ChunkKind::Start,
        room: IVec2::splat(FIXED_ROOM_TILES),
        ..default()
    };

    // Main path: step toward the end along a random axis that still has distance.
    let mut main_path = vec![start];
    let mut current = start;
    while current != end {
        let delta = end - current;
        let step = match (delta.x != 0, delta.y != 0) {
            (true, true) if rng.random_bool(0.5) => IVec2::new(delta.x.signum(), 0),
            (true, true) => IVec2::new(0, delta.y.signum()),
            (true, false) => IVec2::new(delta.x.signum(), 0),
            _ => IVec2::new(0, delta.y.signum()),
        };
        current += step;
        main_path.push(current);

        let chunk = &mut chunks[chunk_index(current)];
        *chunk = if current == end {
            Chunk {
                kind: ChunkKind::End,
                room: IVec2::splat(FIXED_ROOM_TILES),
                ..default()
            }
        } else {
            Chunk {
                kind: ChunkKind::Normal,
                room: normal_room(&mut rng),
                ..default()
            }
        };
    }

    // Branches hang off every main-path chunk, the exit included.
    for &coord in &main_path {
        let mut directions = Direction::ALL;
        directions.shuffle(&mut rng);
        for direction in directions.into_iter().take(branch_count(&mut rng)) {
            let next = coord + direction.offset();
            if !in_bounds(next) || !chunks[chunk_index(next)].is_empty() {
                continue;
            }
            chunks[chunk_index(next)] = Chunk {
                kind: ChunkKind::Normal,
                room: normal_room(&mut rng),
                ..default()
            };
        }
    }

    // Connect every occupied neighbour pair.
    for y in 0..MAP_CHUNKS {
        for x in 0..MAP_CHUNKS {
            let coord = IVec2::new(x, y);
            if chunks[chunk_index(coord)].is_empty() {
                continue;
            }
            for direction in Direction::ALL {
                let next = coord + direction.offset();
                if in_bounds(next) && !chunks[chunk_index(next)].is_empty() {
                    chunks[chunk_index(coord)].hallways.set(direction);
                }
            }
        }
    }

    let mut layout = FloorLayout {
        seed,
        start,
        end,
        main_path,
        chunks,
        tiles: vec![Tile::Void; (MAP_TILES * MAP_TILES) as usize],
        floor_rects: Vec::new(),
    };
    rasterize(&mut layout);
    layout
}

fn hallway_rect(chunk: IVec2, room: TileRect, direction: Direction) -> TileRect {
    let origin = chunk * CHUNK_TILES;
    let lane = (CHUNK_TILES - HALLWAY_WIDTH) / 2;
    let (lane_min, lane_max) = (lane, lane + HALLWAY_WIDTH);
    match direction {
        Direction::Right => TileRect::new(
            IVec2::new(room.max.x, origin.y + lane_min),
            IVec2::new(origin.x + CHUNK_TILES, origin.y + lane_max),
        ),
        Direction::Left => TileRect::new(
            IVec2::new(origin.x, origin.y + lane_min),
            IVec2::new(room.min.x, origin.y + lane_max),
        ),
        Direction::Up => TileRect::new(
            IVec2::new(origin.x + lane_min, room.max.y),
            IVec2::new(origin.x + lane_max, origin.y + CHUNK_TILES),
        ),
        Direction::Down => TileRect::new(
            IVec2::new(origin.x + lane_min, origin.y),
            IVec2::new(origin.x + lane_max, room.min.y),
        ),
    }
}

fn rasterize(layout: &mut FloorLayout) {
    let mut rects = Vec::new();
    for (coord, chunk) in layout.rooms() {
        let Some(room) = layout.room_rect(coord) else {
            continue;
        };
        rects.push(room);
        for direction in Direction::ALL {
            if chunk.hallways.has(direction) {
                let hallway = hallway_rect(coord, room, direction);
                if hallway.size().min_element() > 0 {
                    rects.push(hallway);
                }
            }
        }
    }

    for rect in &rects {
        for y in rect.min.y..rect.max.y {
            for x in rect.min.x..rect.max.x {
                layout.tiles[(y * MAP_TILES + x) as usize] = Tile::Floor;
            }
        }
    }

    // Wall in every empty tile touching the floor, diagonals included.
    for y in 0..MAP_TILES {
        for x in 0..MAP_TILES {
            let tile = IVec2::new(x, y);
            if layout.tile(tile) != Tile::Void {
                continue;
            }
            let touches_floor = (-1..=1)
                .flat_map(|dy| (-1..=1).map(move |dx| IVec2::new(dx, dy)))
                .any(|offset| layout.tile(tile + offset) == Tile::Floor);
            if touches_floor {
                layout.tiles[(y * MAP_TILES + x) as usize] = Tile::Wall;
            }
        }
    }

    layout.floor_rects = rects;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_of_sight_inside_a_room_but_not_through_walls() {
        let layout = generate_floor(3);
        let center = FloorLayout::chunk_center_world(layout.start);
        assert!(layout.line_of_sight(center, center + Vec2::new(60.0, 40.0)));
        // The start room is 12 tiles wide and hallways leave from edge
        // centers, so the diagonal crosses its wall ring.
        let corner = center + Vec2::new(9.0 * TILE_SIZE, 9.0 * TILE_SIZE);
        assert!(!layout.line_of_sight(center, corner));
    }

    #[test]
    fn test_same_seed_same_floor() {
        let a = generate_floor(42);
        let b = generate_floor(42);
        assert_eq!(a.end, b.end);
        assert_eq!(a.main_path, b.main_path);
        assert_eq!(a.floor_rects(), b.floor_rects());
    }

    #[test]
    fn test_start_and_end_placement() {
        for seed in 0..100 {
            let layout = generate_floor(seed);
            assert_eq!(layout.start, IVec2::new(2, 2));
            assert_eq!(layout.chunk(layout.start).unwrap().kind, ChunkKind::Start);
            assert_eq!(layout.chunk(layout.end).unwrap().kind, ChunkKind::End);
            assert!(layout.end.x >= 3 && layout.end.y >= 3);
            assert_eq!(layout.main_path.first(), Some(&layout.start));
            assert_eq!(layout.main_path.last(), Some(&layout.end));
        }
    }

    #[test]
    fn test_main_path_is_contiguous() {
        for seed in 0..50 {
            let layout = generate_floor(seed);
            for pair in layout.main_path.windows(2) {
                let step = pair[1] - pair[0];
                assert_eq!(step.x.abs() + step.y.abs(), 1);
            }
        }
    }

    #[test]
    fn test_every_room_reachable_from_start() {
        for seed in 0..200 {
            let layout = generate_floor(seed);
            let reachable = layout.reachable_from_start();
            for (coord, _) in layout.rooms() {
                assert!(reachable.contains(&coord), "seed {seed}: {coord} unreachable");
            }
        }
    }

    #[test]
    fn test_exit_room_grows_side_rooms() {
        let with_side_room = (0..200)
            .filter(|&seed| {
                let layout = generate_floor(seed);
                // A room only the exit borders can only have come from the exit.
                let only_next_to_exit = |coord: IVec2| {
                    Direction::ALL.into_iter().all(|direction| {
                        let neighbor = coord + direction.offset();
                        neighbor == layout.end || !layout.main_path.contains(&neighbor)
                    })
                };
                Direction::ALL.into_iter().any(|direction| {
                    let next = layout.end + direction.offset();
                    !layout.main_path.contains(&next)
                        && only_next_to_exit(next)
                        && layout
                            .chunk(next)
                            .is_some_and(|chunk| chunk.kind == ChunkKind::Normal)
                })
            })
            .count();
        assert!(with_side_room > 0);
    }

    #[test]
    fn test_hallways_are_symmetric() {
        let layout = generate_floor(7);
        for (coord, chunk) in layout.rooms() {
            for direction in Direction::ALL {
                if chunk.hallways.has(direction) {
                    let other = layout.chunk(coord + direction.offset()).unwrap();
                    let back = match direction {
                        Direction::Up => Direction::Down,
                        Direction::Down => Direction::Up,
                        Direction::Left => Direction::Right,
                        Direction::Right => Direction::Left,
                    };
                    assert!(other.hallways.has(back));
                }
            }
        }
    }

    #[test]
    fn test_room_sizes() {
        for seed in 0..50 {
            let layout = generate_floor(seed);
            for (_, chunk) in layout.rooms() {
                match chunk.kind {
                    ChunkKind::Start | ChunkKind::End => assert_eq!(chunk.room, IVec2::splat(12)),
                    _ => {
                        assert!(chunk.room.x % 2 == 0 && (20..=30).contains(&chunk.room.x));
                        assert!(chunk.room.y % 2 == 0 && (20..=30).contains(&chunk.room.y));
                    }
                }
            }
        }
    }

    #[test]
    fn test_walls_enclose_the_floor() {
        let layout = generate_floor(3);
        for y in 0..MAP_TILES {
            for x in 0..MAP_TILES {
                let tile = IVec2::new(x, y);
                if layout.tile(tile) != Tile::Floor {
                    continue;
                }
                for direction in Direction::ALL {
                    assert_ne!(layout.tile(tile + direction.offset()), Tile::Void);
                }
            }
        }
    }

    #[test]
    fn test_wall_rects_cover_exactly_the_walls() {
        let layout = generate_floor(11);
        let rects = layout.wall_rects();
        let mut covered = HashSet::new();
        for rect in &rects {
            for y in rect.min.y..rect.max.y {
                for x in rect.min.x..rect.max.x {
                    assert!(covered.insert(IVec2::new(x, y)), "overlapping wall rects");
                    assert_eq!(layout.tile(IVec2::new(x, y)), Tile::Wall);
                }
            }
        }
        let wall_tiles = layout.tiles.iter().filter(|t| **t == Tile::Wall).count();
        assert_eq!(covered.len(), wall_tiles);
        // Merged walls leave plenty of room in the collider registry.
        assert!(rects.len() < 400, "{} wall rects", rects.len());
    }

    #[test]
    fn test_random_tile_in_room_is_inset() {
        let layout = generate_floor(5);
        let mut rng = StdRng::seed_from_u64(1);
        let room = layout.room_rect(layout.start).unwrap();
        for _ in 0..100 {
            let position = layout.random_tile_in_room(layout.start, &mut rng).unwrap();
            let tile = FloorLayout::tile_at_world(position);
            assert!(layout.is_walkable(tile));
            assert!(tile.x > room.min.x && tile.x < room.max.x - 1);
            assert!(tile.y > room.min.y && tile.y < room.max.y - 1);
        }
    }

    #[test]
    fn test_world_chunk_round_trip() {
        let center = FloorLayout::chunk_center_world(IVec2::new(3, 1));
        assert_eq!(FloorLayout::chunk_at_world(center), Some(IVec2::new(3, 1)));
        assert_eq!(FloorLayout::chunk_at_world(Vec2::new(-5.0, 10.0)), None);
        let layout = generate_floor(9);
        let start = FloorLayout::chunk_center_world(layout.start);
        assert!(layout.is_walkable(FloorLayout::tile_at_world(start)));
    }
}
